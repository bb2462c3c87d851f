use crate::controller::DEFAULT_PER_PAGE;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub keybindings: Keybindings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub login_url: String,
    pub per_page: u32,
    /// Open the login page in a browser when the backend rejects our token.
    pub open_browser_on_auth_error: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            login_url: "http://localhost:3000/login".to_string(),
            per_page: DEFAULT_PER_PAGE,
            open_browser_on_auth_error: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub open: Vec<String>,
    pub back: Vec<String>,
    pub archive: Vec<String>,
    pub trash: Vec<String>,
    pub restore: Vec<String>,
    pub toggle_read: Vec<String>,
    pub recategorize: Vec<String>,
    pub search: Vec<String>,
    pub next_category: Vec<String>,
    pub prev_category: Vec<String>,
    pub cycle_status: Vec<String>,
    pub reload: Vec<String>,
    pub sync: Vec<String>,
    pub quit: Vec<String>,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            move_up: vec!["k".to_string(), "Up".to_string()],
            move_down: vec!["j".to_string(), "Down".to_string()],
            open: vec!["Enter".to_string(), "l".to_string()],
            back: vec!["Esc".to_string(), "h".to_string()],
            archive: vec!["a".to_string()],
            trash: vec!["d".to_string(), "Backspace".to_string()],
            restore: vec!["u".to_string()],
            toggle_read: vec![" ".to_string()],
            recategorize: vec!["c".to_string()],
            search: vec!["/".to_string()],
            next_category: vec!["Tab".to_string()],
            prev_category: vec!["BackTab".to_string()],
            cycle_status: vec!["f".to_string()],
            reload: vec!["r".to_string()],
            sync: vec!["s".to_string()],
            quit: vec!["q".to_string()],
        }
    }
}

pub fn parse_key_string(key_str: &str) -> (KeyCode, KeyModifiers) {
    // "-" alone is the minus key, not a separator.
    if key_str == "-" {
        return (KeyCode::Char('-'), KeyModifiers::empty());
    }

    let mut parts: Vec<&str> = key_str.split('-').collect();
    let mut modifiers = KeyModifiers::empty();

    // Last part is the key, everything before it a modifier
    let base_key_str = parts.pop().unwrap_or("");

    for part in parts {
        match part.to_lowercase().as_str() {
            "ctrl" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            "cmd" | "command" | "super" => modifiers.insert(KeyModifiers::SUPER),
            "meta" => modifiers.insert(KeyModifiers::META),
            _ => {}
        }
    }

    let mut chars = base_key_str.chars();
    let code = match (base_key_str, chars.next(), chars.next()) {
        ("Backspace", _, _) => KeyCode::Backspace,
        ("Enter", _, _) => KeyCode::Enter,
        ("Left", _, _) => KeyCode::Left,
        ("Right", _, _) => KeyCode::Right,
        ("Up", _, _) => KeyCode::Up,
        ("Down", _, _) => KeyCode::Down,
        ("Tab", _, _) => KeyCode::Tab,
        ("BackTab", _, _) => KeyCode::BackTab,
        ("Esc", _, _) => KeyCode::Esc,
        ("PageUp", _, _) => KeyCode::PageUp,
        ("PageDown", _, _) => KeyCode::PageDown,
        (_, Some(c), None) => KeyCode::Char(c),
        _ => KeyCode::Null,
    };

    (code, modifiers)
}

pub fn matches_key(event: KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| {
        let (code, modifiers) = parse_key_string(b);
        event.code == code && event.modifiers.contains(modifiers)
    })
}

impl Config {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reads `settings.toml` from the working directory, falling back to
    /// defaults when it is missing or broken.
    pub fn load() -> Self {
        if !Path::new(SETTINGS_FILE).exists() {
            return Self::default();
        }
        match Self::load_from(SETTINGS_FILE) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifier_keys() {
        assert_eq!(
            parse_key_string("ctrl-r"),
            (KeyCode::Char('r'), KeyModifiers::CONTROL)
        );
        assert_eq!(
            parse_key_string("ctrl-alt-Enter"),
            (KeyCode::Enter, KeyModifiers::CONTROL | KeyModifiers::ALT)
        );
    }

    #[test]
    fn test_parse_plain_and_unknown_keys() {
        assert_eq!(parse_key_string(" "), (KeyCode::Char(' '), KeyModifiers::empty()));
        assert_eq!(parse_key_string("/"), (KeyCode::Char('/'), KeyModifiers::empty()));
        assert_eq!(parse_key_string("-"), (KeyCode::Char('-'), KeyModifiers::empty()));
        assert_eq!(parse_key_string("Nope"), (KeyCode::Null, KeyModifiers::empty()));
    }

    #[test]
    fn test_matches_key_checks_modifiers() {
        let bindings = vec!["ctrl-s".to_string(), "j".to_string()];
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        let plain_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::empty());
        let j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::empty());
        assert!(matches_key(ctrl_s, &bindings));
        assert!(!matches_key(plain_s, &bindings));
        assert!(matches_key(j, &bindings));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://mail.example.com/api/"

            [keybindings]
            quit = ["ctrl-c"]
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://mail.example.com/api/");
        assert_eq!(config.api.per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.keybindings.quit, vec!["ctrl-c"]);
        assert_eq!(config.keybindings.archive, vec!["a"]);
        assert!(config.sync.enabled);
    }

    #[test]
    fn test_load_from_missing_file_is_read_error() {
        let err = Config::load_from("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

use keyring::Entry;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

const APP_NAME: &str = "gsift";
const TOKEN_KEY: &str = "api_token";
pub const TOKEN_ENV: &str = "GSIFT_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("token must not be empty")]
    EmptyToken,
}

/// Authentication state shared by the API client and the list controller.
pub trait AuthHandler: Send + Sync {
    fn is_authenticated(&self) -> bool;
    /// Called when the backend rejects our credentials.
    fn handle_auth_error(&self);
    fn token(&self) -> Option<String>;
    /// Accepts a token entered by the user.
    fn sign_in(&self, token: &str) -> Result<(), AuthError>;
    fn login_url(&self) -> &str;
}

/// Keeps the API token in the OS keyring.
pub struct RingStorage;

impl RingStorage {
    fn entry(&self) -> Result<Entry, AuthError> {
        Ok(Entry::new(APP_NAME, TOKEN_KEY)?)
    }

    pub fn get_token(&self) -> Result<Option<String>, AuthError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), AuthError> {
        self.entry()?.set_password(token)?;
        Ok(())
    }

    pub fn clear_token(&self) -> Result<(), AuthError> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct KeyringAuth {
    storage: RingStorage,
    token: Mutex<Option<String>>,
    authenticated: AtomicBool,
    login_url: String,
    open_browser: bool,
}

impl KeyringAuth {
    /// Loads the token from `GSIFT_TOKEN` or, failing that, the keyring.
    pub fn load(login_url: &str, open_browser: bool) -> Self {
        let storage = RingStorage;
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| match storage.get_token() {
                Ok(token) => token,
                Err(e) => {
                    warn!("Could not read token from keyring: {}", e);
                    None
                }
            });

        Self {
            storage,
            authenticated: AtomicBool::new(token.is_some()),
            token: Mutex::new(token),
            login_url: login_url.to_string(),
            open_browser,
        }
    }
}

impl AuthHandler for KeyringAuth {
    fn sign_in(&self, token: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        if let Err(e) = self.storage.set_token(token) {
            // The session can still use the token even if the keyring is unavailable.
            warn!("Could not persist token: {}", e);
        }
        if let Ok(mut current) = self.token.lock() {
            *current = Some(token.to_string());
        }
        self.authenticated.store(true, Ordering::SeqCst);
        info!("Signed in");
        Ok(())
    }

    fn login_url(&self) -> &str {
        &self.login_url
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn handle_auth_error(&self) {
        // Several in-flight requests can fail together; only act once.
        if !self.authenticated.swap(false, Ordering::SeqCst) {
            return;
        }
        warn!("Backend rejected credentials, signing out");
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
        if let Err(e) = self.storage.clear_token() {
            warn!("Could not clear stored token: {}", e);
        }
        if self.open_browser {
            if let Err(e) = open::that(&self.login_url) {
                warn!("Could not open login page: {}", e);
            }
        }
    }

    fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }
}

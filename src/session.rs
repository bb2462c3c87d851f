use std::collections::HashMap;
use tracing::debug;

pub const SCROLL_POSITION_KEY: &str = "emailListScrollPosition";

/// Process-lifetime key/value store. Nothing here survives a restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    values: HashMap<String, String>,
}

impl SessionStore {
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Remembers the list offset across a trip to the detail view and hands it
/// back exactly once.
#[derive(Debug, Default)]
pub struct ScrollMemory {
    consumed: bool,
}

impl ScrollMemory {
    pub fn save(&mut self, store: &mut SessionStore, offset: usize) {
        debug!("Saving list scroll position {}", offset);
        store.set(SCROLL_POSITION_KEY, offset.to_string());
        self.consumed = false;
    }

    /// Returns the saved offset the first time it is asked after the initial
    /// load has completed; `None` on every later call.
    pub fn restore(&mut self, store: &mut SessionStore, initial_load_complete: bool) -> Option<usize> {
        if self.consumed || !initial_load_complete {
            return None;
        }
        let saved = store.remove(SCROLL_POSITION_KEY)?;
        self.consumed = true;
        match saved.parse() {
            Ok(offset) => Some(offset),
            Err(_) => {
                debug!("Ignoring unreadable scroll position {:?}", saved);
                None
            }
        }
    }
}

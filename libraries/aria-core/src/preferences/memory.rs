use super::Preferences;
use crate::error::{PreferencesError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory preferences, lost on drop
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Preferences for MemoryPreferences {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| PreferencesError::Poisoned)?
            .insert(key.to_string(), value);
        Ok(())
    }
}

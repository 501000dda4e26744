//! Key/value info store carried by transports and payload units.

use std::collections::BTreeMap;

use super::error::{EdgeError, EdgeResult};

/// String key/value store with case-insensitive keys.
///
/// Keys are normalised to ASCII upper case, so `"caps"` and `"CAPS"` address
/// the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoStore {
    entries: BTreeMap<String, String>,
}

impl InfoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    ///
    /// Empty keys are rejected.
    pub fn set(&mut self, key: &str, value: &str) -> EdgeResult<()> {
        if key.trim().is_empty() {
            return Err(EdgeError::InvalidParameter("info key is empty".into()));
        }
        self.entries
            .insert(key.to_ascii_uppercase(), value.to_owned());
        Ok(())
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&key.to_ascii_uppercase())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

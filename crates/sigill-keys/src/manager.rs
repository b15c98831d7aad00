#![forbid(unsafe_code)]

//! Named key store.

use crate::key::Key;

/// Keys available for lookup by `<KeyName>`.
#[derive(Debug, Default)]
pub struct KeysManager {
    keys: Vec<Key>,
}

impl KeysManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// The first key registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.as_deref() == Some(name))
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

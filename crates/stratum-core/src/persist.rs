#![forbid(unsafe_code)]

//! Flat key/value state persistence.
//!
//! Every stateful part of the stack saves into one shared [`Properties`]
//! map under a caller-supplied prefix: `<prefix>.<name>` → string value.
//! The value formats (pipe-delimited entries, comma-separated index lists)
//! are a compatibility surface — save→load must reproduce the identical
//! in-memory state, so owners hand-roll their encodings rather than going
//! through a serializer.
//!
//! Loading is best-effort: a malformed entry is skipped and the remaining
//! entries still load.

use std::collections::BTreeMap;

/// A flat, deterministic string key/value map.
///
/// Backed by a `BTreeMap` so iteration (and therefore any serialized
/// output) is ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// True if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// State that can be saved to and restored from a [`Properties`] map.
///
/// Implementors own their key names under the caller-supplied prefix and
/// must not write keys for empty state (an absent key means "nothing to
/// restore").
pub trait Persistable {
    /// Save this object's state under `prefix` into `properties`.
    fn save_state(&self, prefix: &str, properties: &mut Properties);

    /// Restore this object's state from `properties` under `prefix`.
    fn load_state(&mut self, prefix: &str, properties: &Properties);
}

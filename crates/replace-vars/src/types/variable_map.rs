//! The in-memory mapping produced by the variables loader.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Serialize, Serializer};

/// Mapping from variable name to value.
///
/// Both keys and values are whitespace-trimmed on insertion, so no entry ever
/// carries leading or trailing whitespace no matter how the map was built.
/// Inserting an existing key replaces its value.
///
/// # Example
///
/// ```
/// use replace_vars::VariableMap;
///
/// let mut vars = VariableMap::new();
/// vars.insert("  name ", " World ");
/// assert_eq!(vars.get("name"), Some("World"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableMap {
    entries: HashMap<String, String>,
}

impl VariableMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, trimming key and value. Returns the replaced value.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Option<String> {
        let key = key.as_ref().trim();
        let value = value.as_ref().trim().to_string();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => Some(occupied.insert(value)),
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                None
            }
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by key.
    ///
    /// Used wherever iteration order becomes observable (`range`, printing a
    /// map, JSON dumps).
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for VariableMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = VariableMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for VariableMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sorted())
    }
}

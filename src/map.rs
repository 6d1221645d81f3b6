//! Ordered map type for portable storage sections.
//!
//! This module provides [`Section`], a wrapper around [`IndexMap`] that keeps
//! keys in the order they were inserted or decoded, so a decoded section
//! re-encodes with its entries in the same order.
//!
//! Order carries no meaning beyond that: two sections are equal when they
//! hold the same keys mapped to equal values.
//!
//! Keys are Rust `String`s. The wire allows any key bytes, but a decoded key
//! that is not valid UTF-8 is rejected with [`Error::InvalidKey`]; string
//! values have no such restriction.
//!
//! [`Error::InvalidKey`]: crate::Error::InvalidKey
//!
//! ## Examples
//!
//! ```rust
//! use portable_storage::{Section, Value};
//!
//! let mut a = Section::new();
//! a.insert("x".to_string(), Value::from(1));
//! a.insert("y".to_string(), Value::from(2));
//!
//! let mut b = Section::new();
//! b.insert("y".to_string(), Value::from(2));
//! b.insert("x".to_string(), Value::from(1));
//!
//! assert_eq!(a, b);
//! assert_eq!(a.keys().collect::<Vec<_>>(), ["x", "y"]);
//! ```

use crate::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// A string-keyed mapping of portable storage values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section(IndexMap<String, Value>);

impl Section {
    /// Creates an empty `Section`.
    #[must_use]
    pub fn new() -> Self {
        Section(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Section(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair.
    ///
    /// If the key was present its value is replaced in place and the old
    /// value is returned; the key keeps its original position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::{Section, Value};
    ///
    /// let mut section = Section::new();
    /// assert!(section.insert("key".to_string(), Value::from(42)).is_none());
    /// assert!(section.insert("key".to_string(), Value::from(43)).is_some());
    /// assert_eq!(section.get("key").and_then(Value::as_i64), Some(43));
    /// ```
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Returns an iterator over the values, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    /// Returns an iterator over the entries, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<HashMap<String, Value>> for Section {
    fn from(map: HashMap<String, Value>) -> Self {
        Section(map.into_iter().collect())
    }
}

impl From<Section> for HashMap<String, Value> {
    fn from(section: Section) -> Self {
        section.0.into_iter().collect()
    }
}

impl IntoIterator for Section {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Section {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Section {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Section(IndexMap::from_iter(iter))
    }
}

impl Serialize for Section {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Section(section) => Ok(section),
            other => Err(serde::de::Error::custom(format!(
                "expected section, found {}",
                other.kind_name()
            ))),
        }
    }
}

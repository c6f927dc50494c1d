//! Ordered, case-insensitively keyed name/value lists.
//!
//! Struct values on both sides of the codec use this type: field order is
//! significant (positional construction, literal rendering) while lookups
//! ignore case because the remote service lowercases field names in results.

use serde::Serialize;

/// Compare two field names ignoring case.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || (!a.is_ascii() && a.to_lowercase() == b.to_lowercase())
}

/// Ordered list of `(name, value)` pairs with case-insensitive lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Fields<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Fields<V> {
    /// Create an empty field list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty field list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append a field, keeping any existing entry with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: V) {
        self.entries.push((name.into(), value));
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: V) -> Self {
        self.push(name, value);
        self
    }

    /// Set a field, replacing the first case-insensitive match in place.
    pub fn set(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Index of the field matching `name`.
    ///
    /// An exact match wins over a case-insensitive one.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n == name)
            .or_else(|| self.entries.iter().position(|(n, _)| names_match(n, name)))
    }

    /// Look up a field value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.position(name).map(|idx| &self.entries[idx].1)
    }

    /// Check whether a field with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Field values in order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> FromIterator<(String, V)> for Fields<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V> IntoIterator for Fields<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

//! Raw per-step field values as entered by the user.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single raw value. Text is kept exactly as typed; interpretation happens
/// in validators and transformers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Choice(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn choice(value: impl Into<String>) -> Self {
        FieldValue::Choice(value.into())
    }

    /// Textual form used for comparisons and conditional requirements.
    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(value) | FieldValue::Choice(value) => value,
            FieldValue::Flag(true) => "true",
            FieldValue::Flag(false) => "false",
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(value) | FieldValue::Choice(value) => value.trim().is_empty(),
            FieldValue::Flag(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(true) => f.write_str("yes"),
            FieldValue::Flag(false) => f.write_str("no"),
            other => f.write_str(other.as_text()),
        }
    }
}

/// Field key to raw value map for one wizard step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStore {
    values: BTreeMap<String, FieldValue>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Trimmed text of a non-blank value.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .filter(|value| !value.is_blank())
            .map(|value| value.as_text().trim())
    }

    /// Boolean interpretation of a value; missing or unrecognised values are
    /// false.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(FieldValue::Flag(value)) => *value,
            Some(other) => matches!(
                other.as_text().trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "1"
            ),
            None => false,
        }
    }

    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).map_or(true, FieldValue::is_blank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FieldStore {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        let mut store = FieldStore::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

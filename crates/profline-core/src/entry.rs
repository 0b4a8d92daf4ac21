//! Profile entries.

use serde::Serialize;

use crate::value::Value;

/// A single key/value pair within a profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// The key, including its argument marker (e.g. `-Retries`).
    pub key: String,
    /// The value; interpretation is up to the reader.
    pub value: Value,
}

impl Entry {
    /// Create a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Entry {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

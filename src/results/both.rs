use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::types::RowValues;

/// Key of a [`BothRow`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Index(usize),
    Name(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Index(idx) => write!(f, "{idx}"),
            RowKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for RowKey {
    fn from(value: usize) -> Self {
        RowKey::Index(value)
    }
}

impl From<&str> for RowKey {
    fn from(value: &str) -> Self {
        RowKey::Name(value.to_string())
    }
}

/// The legacy "both" shape: every value appears under its 0-based column
/// index and again under its field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BothRow {
    entries: Vec<(RowKey, RowValues)>,
}

impl BothRow {
    pub(crate) fn from_fields(fields: impl IntoIterator<Item = (String, RowValues)>) -> Self {
        let mut entries = Vec::new();
        for (idx, (name, value)) in fields.into_iter().enumerate() {
            entries.push((RowKey::Index(idx), value.clone()));
            entries.push((RowKey::Name(name), value));
        }
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, key: impl Into<RowKey>) -> Option<&RowValues> {
        let key = key.into();
        self.entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn entries(&self) -> &[(RowKey, RowValues)] {
        &self.entries
    }

    /// Number of columns (half the number of entries).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.entries.len() / 2
    }
}

impl Serialize for BothRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

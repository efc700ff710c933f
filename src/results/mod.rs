//! Row shapes produced by the fetch engine.

mod both;
mod record;
mod result_set;
mod row;

pub use both::{BothRow, RowKey};
pub use record::{Field, Record};
pub use result_set::ResultSet;
pub use row::Row;

pub(crate) use row::index_columns;

use serde::Serialize;

use crate::types::RowValues;

/// A row as returned by `fetch`, in the shape selected by the fetch mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchedRow {
    Assoc(Row),
    Object(Record),
    Both(BothRow),
}

impl FetchedRow {
    /// Look a value up by field name, whatever the shape.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        match self {
            FetchedRow::Assoc(row) => row.get(name),
            FetchedRow::Object(record) => record.get(name),
            FetchedRow::Both(row) => row.get(name),
        }
    }

    /// Field names in column order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            FetchedRow::Assoc(row) => row.column_names.iter().map(String::as_str).collect(),
            FetchedRow::Object(record) => record.names().collect(),
            FetchedRow::Both(row) => row
                .entries()
                .iter()
                .filter_map(|(key, _)| match key {
                    RowKey::Name(name) => Some(name.as_str()),
                    RowKey::Index(_) => None,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn as_assoc(&self) -> Option<&Row> {
        match self {
            FetchedRow::Assoc(row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FetchedRow::Object(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_both(&self) -> Option<&BothRow> {
        match self {
            FetchedRow::Both(row) => Some(row),
            _ => None,
        }
    }
}

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CacheDbError;
use crate::native::{NativeField, NativeRow};
use crate::results::{BothRow, FetchedRow, Record, Row};
use crate::types::RowValues;

/// Shape in which `fetch` hands rows out.
///
/// The numeric codes are the PDO-compatible ones callers may still pass around.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
pub enum FetchMode {
    /// Field name to value
    #[value(name = "assoc")]
    #[serde(rename = "assoc")]
    Assoc,
    /// Every value under its column index and its field name
    #[value(name = "both")]
    #[serde(rename = "both")]
    Both,
    /// Typed record built field by field
    #[default]
    #[value(name = "obj", alias = "object")]
    #[serde(rename = "obj", alias = "object")]
    Object,
}

impl FetchMode {
    pub const ASSOC_CODE: i64 = 2;
    pub const BOTH_CODE: i64 = 4;
    pub const OBJECT_CODE: i64 = 5;

    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            FetchMode::Assoc => Self::ASSOC_CODE,
            FetchMode::Both => Self::BOTH_CODE,
            FetchMode::Object => Self::OBJECT_CODE,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FetchMode::Assoc => "assoc",
            FetchMode::Both => "both",
            FetchMode::Object => "obj",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i64> for FetchMode {
    type Error = CacheDbError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            Self::ASSOC_CODE => Ok(FetchMode::Assoc),
            Self::BOTH_CODE => Ok(FetchMode::Both),
            Self::OBJECT_CODE => Ok(FetchMode::Object),
            other => Err(CacheDbError::UnsupportedFetchMode(other.to_string())),
        }
    }
}

impl FromStr for FetchMode {
    type Err = CacheDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<i64>() {
            return FetchMode::try_from(code);
        }
        <FetchMode as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| CacheDbError::UnsupportedFetchMode(s.to_string()))
    }
}

/// Per-connection rules applied to every fetched row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchPolicy {
    pub lowercase_names: bool,
    pub null_to_string: bool,
    pub empty_string_to_null: bool,
}

impl FetchPolicy {
    /// Null-to-string runs before empty-to-null.
    #[must_use]
    pub fn apply(&self, value: RowValues) -> RowValues {
        let value = if self.null_to_string && value.is_null() {
            RowValues::Text(String::new())
        } else {
            value
        };
        if self.empty_string_to_null && value.is_empty_value() {
            RowValues::Null
        } else {
            value
        }
    }

    #[must_use]
    pub fn fold_name(&self, name: &str) -> String {
        if self.lowercase_names {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }
}

/// Turns native rows into [`FetchedRow`]s, caching the folded column names
/// while the cursor keeps handing out the same column list.
#[derive(Debug, Clone)]
pub(crate) struct RowShaper {
    policy: FetchPolicy,
    source: Option<Arc<Vec<String>>>,
    names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl RowShaper {
    pub(crate) fn new(policy: FetchPolicy) -> Self {
        Self {
            policy,
            source: None,
            names: Arc::new(Vec::new()),
            index: Arc::new(HashMap::new()),
        }
    }

    fn refresh_names(&mut self, columns: &Arc<Vec<String>>) {
        if self
            .source
            .as_ref()
            .is_some_and(|source| Arc::ptr_eq(source, columns))
        {
            return;
        }
        let folded: Vec<String> = columns
            .iter()
            .map(|name| self.policy.fold_name(name))
            .collect();
        self.index = crate::results::index_columns(&folded);
        self.names = Arc::new(folded);
        self.source = Some(Arc::clone(columns));
    }

    pub(crate) fn shape(&mut self, row: NativeRow, mode: FetchMode) -> FetchedRow {
        self.refresh_names(&row.columns);
        let values: Vec<RowValues> = row
            .fields
            .into_iter()
            .map(|field| match field {
                NativeField::Value(value) => self.policy.apply(value),
                NativeField::Cursor(_) => {
                    tracing::debug!("cursor outside the leading field fetched as NULL");
                    self.policy.apply(RowValues::Null)
                }
            })
            .collect();

        match mode {
            FetchMode::Assoc => FetchedRow::Assoc(Row::with_cache(
                Arc::clone(&self.names),
                values,
                Arc::clone(&self.index),
            )),
            FetchMode::Object => {
                let mut record = Record::with_capacity(values.len());
                for (name, value) in self.names.iter().zip(values) {
                    record.set(name.as_str(), value);
                }
                FetchedRow::Object(record)
            }
            FetchMode::Both => {
                FetchedRow::Both(BothRow::from_fields(self.names.iter().cloned().zip(values)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(columns: &[&str], values: Vec<RowValues>) -> NativeRow {
        NativeRow {
            columns: Arc::new(columns.iter().map(|c| (*c).to_string()).collect()),
            fields: values.into_iter().map(NativeField::Value).collect(),
        }
    }

    #[test]
    fn mode_codes_round_trip() {
        for mode in [FetchMode::Assoc, FetchMode::Both, FetchMode::Object] {
            assert_eq!(FetchMode::try_from(mode.code()).unwrap(), mode);
            assert_eq!(mode.name().parse::<FetchMode>().unwrap(), mode);
        }
        assert_eq!("object".parse::<FetchMode>().unwrap(), FetchMode::Object);
        assert_eq!("2".parse::<FetchMode>().unwrap(), FetchMode::Assoc);
    }

    #[test]
    fn unknown_modes_are_rejected() {
        for code in [0, 1, 3, 6, 7, -2] {
            let err = FetchMode::try_from(code).unwrap_err();
            assert!(matches!(err, CacheDbError::UnsupportedFetchMode(_)));
        }
        assert!(matches!(
            "column".parse::<FetchMode>(),
            Err(CacheDbError::UnsupportedFetchMode(_))
        ));
    }

    #[test]
    fn default_mode_is_object() {
        assert_eq!(FetchMode::default(), FetchMode::Object);
    }

    #[test]
    fn lowercase_folding_is_idempotent() {
        let policy = FetchPolicy {
            lowercase_names: true,
            ..FetchPolicy::default()
        };
        let once = policy.fold_name("UserName");
        assert_eq!(once, "username");
        assert_eq!(policy.fold_name(&once), once);

        let natural = FetchPolicy::default();
        assert_eq!(natural.fold_name("UserName"), "UserName");
    }

    #[test]
    fn null_policies_run_in_order() {
        let to_string = FetchPolicy {
            null_to_string: true,
            ..FetchPolicy::default()
        };
        assert_eq!(to_string.apply(RowValues::Null), RowValues::Text(String::new()));

        let to_null = FetchPolicy {
            empty_string_to_null: true,
            ..FetchPolicy::default()
        };
        assert_eq!(to_null.apply(RowValues::Text(String::new())), RowValues::Null);
        assert_eq!(to_null.apply(RowValues::Int(0)), RowValues::Int(0));

        let both = FetchPolicy {
            null_to_string: true,
            empty_string_to_null: true,
            ..FetchPolicy::default()
        };
        assert_eq!(both.apply(RowValues::Null), RowValues::Null);
    }

    #[test]
    fn shapes_follow_mode_with_policies_everywhere() {
        let policy = FetchPolicy {
            lowercase_names: true,
            null_to_string: true,
            empty_string_to_null: false,
        };
        let mut shaper = RowShaper::new(policy);
        for mode in [FetchMode::Assoc, FetchMode::Object, FetchMode::Both] {
            let row = shaper.shape(
                native(&["ID", "Nick"], vec![RowValues::Int(1), RowValues::Null]),
                mode,
            );
            assert_eq!(row.field_names(), vec!["id", "nick"]);
            assert_eq!(row.get("nick"), Some(&RowValues::Text(String::new())));
        }
    }
}

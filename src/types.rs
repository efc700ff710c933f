use chrono::NaiveDateTime;
use serde::Serialize;
use serde::ser::Serializer;

/// Values that can be stored in a database row or bound as statement parameters.
///
/// ```rust
/// use cache_sql_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Empty text or an empty blob; the values the empty-to-null policy rewrites.
    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        match self {
            RowValues::Text(s) => s.is_empty(),
            RowValues::Blob(b) => b.is_empty(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Cache returns %TimeStamp as "YYYY-MM-DD HH:MM:SS[.fff]"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValues::Int(i) => serializer.serialize_i64(*i),
            RowValues::Float(f) => serializer.serialize_f64(*f),
            RowValues::Text(s) => serializer.serialize_str(s),
            RowValues::Bool(b) => serializer.serialize_bool(*b),
            RowValues::Timestamp(dt) => {
                serializer.collect_str(&dt.format("%Y-%m-%d %H:%M:%S%.f"))
            }
            RowValues::Null => serializer.serialize_none(),
            RowValues::Blob(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Key used to bind a value to a statement.
///
/// Named keys address `:name` markers (the leading colon is optional when
/// binding). Positional keys are 1-based and address raw `?` markers in the
/// order they appear in the original SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Named(String),
    Position(usize),
}

impl ParamKey {
    #[must_use]
    pub fn named(name: &str) -> Self {
        ParamKey::Named(name.strip_prefix(':').unwrap_or(name).to_string())
    }
}

impl From<&str> for ParamKey {
    fn from(value: &str) -> Self {
        ParamKey::named(value)
    }
}

impl From<String> for ParamKey {
    fn from(value: String) -> Self {
        ParamKey::named(&value)
    }
}

impl From<usize> for ParamKey {
    fn from(value: usize) -> Self {
        ParamKey::Position(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_drop_the_leading_colon() {
        assert_eq!(ParamKey::from(":id"), ParamKey::Named("id".into()));
        assert_eq!(ParamKey::from("id"), ParamKey::Named("id".into()));
        assert_eq!(ParamKey::from(2usize), ParamKey::Position(2));
    }

    #[test]
    fn empty_values() {
        assert!(RowValues::Text(String::new()).is_empty_value());
        assert!(RowValues::Blob(Vec::new()).is_empty_value());
        assert!(!RowValues::Int(0).is_empty_value());
        assert!(!RowValues::Null.is_empty_value());
    }

    #[test]
    fn timestamps_parse_from_text() {
        let value = RowValues::Text("2024-03-01 10:15:00.250".into());
        let ts = value.as_timestamp().unwrap();
        assert_eq!(ts.format("%H:%M:%S%.3f").to_string(), "10:15:00.250");
    }
}

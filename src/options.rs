use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::CacheDbError;
use crate::native::{Credentials, NativeDriver};
use crate::statement::{FetchMode, FetchPolicy};
use crate::connection::Connection;

/// Typed connection attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    DefaultFetchMode,
    /// Lowercase field names on fetch
    Case,
    NullToString,
    EmptyStringToNull,
    Persistent,
    /// Issue `START TRANSACTION` / `COMMIT` / `ROLLBACK` around native calls
    ExplicitTransactionMarkers,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::DefaultFetchMode,
        Attribute::Case,
        Attribute::NullToString,
        Attribute::EmptyStringToNull,
        Attribute::Persistent,
        Attribute::ExplicitTransactionMarkers,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Attribute::DefaultFetchMode => "default_fetch_mode",
            Attribute::Case => "case",
            Attribute::NullToString => "null_to_string",
            Attribute::EmptyStringToNull => "empty_string_to_null",
            Attribute::Persistent => "persistent",
            Attribute::ExplicitTransactionMarkers => "explicit_transaction_markers",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value stored in the attribute table.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    FetchMode(FetchMode),
    Flag(bool),
    /// Pass-through value of a key the adapter does not interpret
    Json(JsonValue),
}

impl AttributeValue {
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttributeValue::Flag(flag) => Some(*flag),
            AttributeValue::Json(JsonValue::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_fetch_mode(&self) -> Option<FetchMode> {
        match self {
            AttributeValue::FetchMode(mode) => Some(*mode),
            _ => None,
        }
    }
}

/// Connection attribute table. Every typed attribute defaults to its neutral
/// value: object fetch mode, natural case, no null rewriting, non-persistent,
/// no explicit transaction markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOptions {
    pub default_fetch_mode: FetchMode,
    pub lowercase_names: bool,
    pub null_to_string: bool,
    pub empty_string_to_null: bool,
    pub persistent: bool,
    pub explicit_transaction_markers: bool,
    /// Keys the adapter stores but does not interpret
    pub extra: BTreeMap<String, JsonValue>,
}

impl CacheOptions {
    #[must_use]
    pub fn builder() -> CacheOptionsBuilder {
        CacheOptionsBuilder::new()
    }

    #[must_use]
    pub fn get(&self, attr: Attribute) -> AttributeValue {
        match attr {
            Attribute::DefaultFetchMode => AttributeValue::FetchMode(self.default_fetch_mode),
            Attribute::Case => AttributeValue::Flag(self.lowercase_names),
            Attribute::NullToString => AttributeValue::Flag(self.null_to_string),
            Attribute::EmptyStringToNull => AttributeValue::Flag(self.empty_string_to_null),
            Attribute::Persistent => AttributeValue::Flag(self.persistent),
            Attribute::ExplicitTransactionMarkers => {
                AttributeValue::Flag(self.explicit_transaction_markers)
            }
        }
    }

    /// Look an attribute up by its config name; unknown names yield `None`.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<AttributeValue> {
        match Attribute::from_name(name) {
            Some(attr) => Some(self.get(attr)),
            None => self.extra.get(name).cloned().map(AttributeValue::Json),
        }
    }

    /// Update a typed attribute.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConfigError` when the value does not fit the attribute.
    pub fn set(&mut self, attr: Attribute, value: AttributeValue) -> Result<(), CacheDbError> {
        if attr == Attribute::DefaultFetchMode {
            self.default_fetch_mode = match &value {
                AttributeValue::FetchMode(mode) => *mode,
                AttributeValue::Json(json) => fetch_mode_from_json(json)?,
                AttributeValue::Flag(_) => return Err(mismatch(attr, &value)),
            };
            return Ok(());
        }
        let flag = value.as_flag().ok_or_else(|| mismatch(attr, &value))?;
        match attr {
            Attribute::Case => self.lowercase_names = flag,
            Attribute::NullToString => self.null_to_string = flag,
            Attribute::EmptyStringToNull => self.empty_string_to_null = flag,
            Attribute::Persistent => self.persistent = flag,
            Attribute::ExplicitTransactionMarkers => self.explicit_transaction_markers = flag,
            Attribute::DefaultFetchMode => {}
        }
        Ok(())
    }

    /// Update an attribute from a config entry. Unknown names are stored as-is.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConfigError` or `UnsupportedFetchMode` when a
    /// known attribute gets a value it cannot hold.
    pub fn set_by_name(&mut self, name: &str, value: JsonValue) -> Result<(), CacheDbError> {
        match Attribute::from_name(name) {
            Some(Attribute::Case) => {
                let lower = match &value {
                    JsonValue::String(case) => match case.to_ascii_lowercase().as_str() {
                        "lower" => true,
                        "natural" => false,
                        _ => {
                            return Err(CacheDbError::ConfigError(format!(
                                "case must be lower or natural, got {case}"
                            )));
                        }
                    },
                    JsonValue::Bool(flag) => *flag,
                    other => {
                        return Err(mismatch(
                            Attribute::Case,
                            &AttributeValue::Json(other.clone()),
                        ));
                    }
                };
                self.lowercase_names = lower;
                Ok(())
            }
            Some(attr) => self.set(attr, AttributeValue::Json(value)),
            None => {
                self.extra.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            lowercase_names: self.lowercase_names,
            null_to_string: self.null_to_string,
            empty_string_to_null: self.empty_string_to_null,
        }
    }
}

fn mismatch(attr: Attribute, value: &AttributeValue) -> CacheDbError {
    CacheDbError::ConfigError(format!("attribute {attr} cannot hold {value:?}"))
}

fn fetch_mode_from_json(value: &JsonValue) -> Result<FetchMode, CacheDbError> {
    match value {
        JsonValue::Number(num) => match num.as_i64() {
            Some(code) => FetchMode::try_from(code),
            None => Err(CacheDbError::UnsupportedFetchMode(num.to_string())),
        },
        JsonValue::String(name) => name.parse(),
        other => Err(CacheDbError::UnsupportedFetchMode(other.to_string())),
    }
}

/// Fluent builder for [`CacheOptions`].
#[derive(Debug, Clone, Default)]
pub struct CacheOptionsBuilder {
    opts: CacheOptions,
}

impl CacheOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.opts.default_fetch_mode = mode;
        self
    }

    #[must_use]
    pub fn lowercase_names(mut self, lowercase: bool) -> Self {
        self.opts.lowercase_names = lowercase;
        self
    }

    #[must_use]
    pub fn null_to_string(mut self, enabled: bool) -> Self {
        self.opts.null_to_string = enabled;
        self
    }

    #[must_use]
    pub fn empty_string_to_null(mut self, enabled: bool) -> Self {
        self.opts.empty_string_to_null = enabled;
        self
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.opts.persistent = persistent;
        self
    }

    #[must_use]
    pub fn explicit_transaction_markers(mut self, enabled: bool) -> Self {
        self.opts.explicit_transaction_markers = enabled;
        self
    }

    /// Store a key the adapter does not interpret.
    #[must_use]
    pub fn extra(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.opts.extra.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn finish(self) -> CacheOptions {
        self.opts
    }

    /// Connect with these options.
    ///
    /// # Errors
    ///
    /// Returns `CacheDbError::ConnectionError` if the native connect fails.
    pub fn connect(
        self,
        driver: &dyn NativeDriver,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<Connection, CacheDbError> {
        Connection::connect(driver, endpoint, credentials, self.finish())
    }
}

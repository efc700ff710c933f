//! Connection configuration loaded from a config map.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::CacheDbError;
use crate::native::Credentials;
use crate::options::CacheOptions;
use crate::registry::DEFAULT_STRATEGY;

/// Port given either as a number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u64),
    Text(String),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(port) => write!(f, "{port}"),
            Port::Text(port) => f.write_str(port),
        }
    }
}

/// One connection entry of the application config.
///
/// Either `dsn` is set, or `unix_driver`, `host`, `port` and `database` are
/// all present. `options` holds attribute names plus the strategy keys
/// `grammar.query`, `grammar.schema` and `processor` (the grammar keys may
/// also be written as a nested `grammar` object).
///
/// ```rust
/// use cache_sql_middleware::prelude::*;
///
/// let cfg = ConnectionConfig::from_json_str(
///     r#"{"unix_driver": "/usr/lib/libcacheodbc.so", "host": "db", "port": 1972,
///         "database": "USER", "options": {"case": "lower"}}"#,
/// )
/// .unwrap();
/// assert_eq!(
///     cfg.endpoint().unwrap(),
///     "Driver={/usr/lib/libcacheodbc.so};Server=db;PORT=1972;DATABASE=USER"
/// );
/// assert!(cfg.cache_options().unwrap().lowercase_names);
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub driver: Option<String>,
    pub dsn: Option<String>,
    pub unix_driver: Option<String>,
    pub host: Option<String>,
    pub port: Option<Port>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub options: Map<String, JsonValue>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("dsn", &self.dsn)
            .field("unix_driver", &self.unix_driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("schema", &self.schema)
            .field("options", &self.options)
            .finish()
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, CacheDbError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CacheDbError::ConfigError(format!("missing connection field: {field}")))
}

const STRATEGY_KEYS: [&str; 4] = ["grammar", "grammar.query", "grammar.schema", "processor"];

impl ConnectionConfig {
    /// Parse one connection entry from JSON.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConfigError` when the text is not a valid entry.
    pub fn from_json_str(json: &str) -> Result<Self, CacheDbError> {
        serde_json::from_str(json)
            .map_err(|err| CacheDbError::ConfigError(format!("invalid connection config: {err}")))
    }

    /// # Errors
    /// Returns `CacheDbError::ConfigError` when the value is not a valid entry.
    pub fn from_json_value(value: JsonValue) -> Result<Self, CacheDbError> {
        serde_json::from_value(value)
            .map_err(|err| CacheDbError::ConfigError(format!("invalid connection config: {err}")))
    }

    /// Native connection string.
    ///
    /// A `dsn` wins, minus any `odbc:` prefix. Otherwise the string is
    /// assembled as `Driver={<unix_driver>};Server=<host>;PORT=<port>;DATABASE=<database>`.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConfigError` naming the first missing field.
    pub fn endpoint(&self) -> Result<String, CacheDbError> {
        if let Some(dsn) = self.dsn.as_deref().map(str::trim).filter(|dsn| !dsn.is_empty()) {
            return Ok(dsn.strip_prefix("odbc:").unwrap_or(dsn).to_string());
        }
        let driver = required(self.unix_driver.as_deref(), "unix_driver")?;
        let host = required(self.host.as_deref(), "host")?;
        let port = self.port.as_ref().map(ToString::to_string);
        let port = required(port.as_deref(), "port")?;
        let database = required(self.database.as_deref(), "database")?;
        Ok(format!(
            "Driver={{{driver}}};Server={host};PORT={port};DATABASE={database}"
        ))
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
    }

    /// Attribute table built from `options`, strategy keys excluded.
    ///
    /// # Errors
    /// Returns the error of the first attribute that cannot hold its value.
    pub fn cache_options(&self) -> Result<CacheOptions, CacheDbError> {
        let mut options = CacheOptions::default();
        for (name, value) in &self.options {
            if STRATEGY_KEYS.contains(&name.as_str()) {
                continue;
            }
            options.set_by_name(name, value.clone())?;
        }
        Ok(options)
    }

    fn grammar_key(&self, kind: &str) -> &str {
        let nested = self
            .options
            .get("grammar")
            .and_then(|grammar| grammar.get(kind))
            .and_then(JsonValue::as_str);
        let dotted = self
            .options
            .get(&format!("grammar.{kind}"))
            .and_then(JsonValue::as_str);
        nested.or(dotted).unwrap_or(DEFAULT_STRATEGY)
    }

    /// Registry key of the query grammar.
    #[must_use]
    pub fn query_grammar_key(&self) -> &str {
        self.grammar_key("query")
    }

    #[must_use]
    pub fn schema_grammar_key(&self) -> &str {
        self.grammar_key("schema")
    }

    #[must_use]
    pub fn processor_key(&self) -> &str {
        self.options
            .get("processor")
            .and_then(JsonValue::as_str)
            .unwrap_or(DEFAULT_STRATEGY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn dsn_prefix_is_stripped() {
        let cfg = ConnectionConfig {
            dsn: Some("odbc:CacheDSN".into()),
            host: Some("ignored".into()),
            ..ConnectionConfig::default()
        };
        assert_eq!(cfg.endpoint().unwrap(), "CacheDSN");

        let cfg = ConnectionConfig {
            dsn: Some("CacheDSN".into()),
            ..ConnectionConfig::default()
        };
        assert_eq!(cfg.endpoint().unwrap(), "CacheDSN");
    }

    #[test]
    fn port_may_be_text() {
        let cfg = ConnectionConfig::from_json_value(json!({
            "unix_driver": "libcache.so",
            "host": "10.0.0.1",
            "port": "56773",
            "database": "SAMPLES",
        }))
        .unwrap();
        assert_eq!(
            cfg.endpoint().unwrap(),
            "Driver={libcache.so};Server=10.0.0.1;PORT=56773;DATABASE=SAMPLES"
        );
    }

    #[test]
    fn missing_field_is_named() {
        let cfg = ConnectionConfig::from_json_value(json!({
            "unix_driver": "libcache.so",
            "host": "db",
            "database": "",
        }))
        .unwrap();
        let err = cfg.endpoint().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("port"));

        let cfg = ConnectionConfig::from_json_value(json!({
            "unix_driver": "libcache.so",
            "host": "db",
            "port": 1972,
            "database": "",
        }))
        .unwrap();
        assert!(cfg.endpoint().unwrap_err().to_string().contains("database"));
    }

    #[test]
    fn strategy_keys_are_not_attributes() {
        let cfg = ConnectionConfig::from_json_value(json!({
            "dsn": "x",
            "options": {
                "grammar": {"query": "legacy"},
                "grammar.schema": "legacy_schema",
                "processor": "custom",
                "null_to_string": true,
                "timeout": 30,
            }
        }))
        .unwrap();
        assert_eq!(cfg.query_grammar_key(), "legacy");
        assert_eq!(cfg.schema_grammar_key(), "legacy_schema");
        assert_eq!(cfg.processor_key(), "custom");

        let options = cfg.cache_options().unwrap();
        assert!(options.null_to_string);
        assert_eq!(options.extra.len(), 1);
        assert_eq!(options.extra.get("timeout"), Some(&json!(30)));
    }

    #[test]
    fn defaults_to_builtin_strategies() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.query_grammar_key(), DEFAULT_STRATEGY);
        assert_eq!(cfg.schema_grammar_key(), DEFAULT_STRATEGY);
        assert_eq!(cfg.processor_key(), DEFAULT_STRATEGY);
        assert_eq!(cfg.credentials(), Credentials::default());
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = ConnectionConfig::from_json_str("{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = ConnectionConfig {
            password: Some("hunter2".into()),
            ..ConnectionConfig::default()
        };
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}

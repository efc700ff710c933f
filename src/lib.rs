//! Parameterized statements, transactions and pagination for InterSystems
//! Caché over a call-level interface.
//!
//! The native layer ([`native`]) only knows positional `?` markers, reports
//! failures through an error state, and has no `offset`. This crate puts a
//! portable API on top: `:name` markers, typed errors, three fetch modes,
//! a two-state transaction controller, and `TOP` / `%vid` pagination.
//!
//! ```rust,no_run
//! use cache_sql_middleware::prelude::*;
//!
//! # fn demo(driver: &dyn NativeDriver) -> Result<(), CacheDbError> {
//! let cfg = ConnectionConfig::from_json_str(r#"{"dsn": "odbc:CacheDSN"}"#)?;
//! let conn = Connection::from_config(driver, &cfg, &StrategyRegistry::new())?;
//!
//! let page = SelectQuery::table("users").order_by("id").for_page(2, 25);
//! let rows = conn.select_query(&page)?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod config;
pub mod connection;
pub mod error;
pub mod grammar;
pub mod native;
pub mod options;
pub mod processor;
pub mod query;
pub mod query_builder;
pub mod registry;
pub mod results;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ConnectionConfig;
pub use connection::{Connection, TxState};
pub use error::{CacheDbError, ErrorKind, NativeDiagnostic};
pub use options::{Attribute, AttributeValue, CacheOptions, CacheOptionsBuilder};
pub use query::QueryAndParams;
pub use query_builder::QueryBuilder;
pub use registry::StrategyRegistry;
pub use results::{BothRow, FetchedRow, Record, ResultSet, Row};
pub use statement::{FetchMode, PreparedStatement};
pub use types::{ParamKey, RowValues};

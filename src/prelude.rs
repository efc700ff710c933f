//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConnectionConfig, Port};
pub use crate::connection::{Connection, TxState};
pub use crate::error::{CacheDbError, ErrorKind, NativeDiagnostic};
pub use crate::grammar::{
    Blueprint, CacheGrammar, CacheSchemaGrammar, DefaultValue, DialectContext, Direction,
    Grammar, Limit, OrderBy, SchemaGrammar, SelectQuery,
};
pub use crate::native::{Credentials, NativeDriver, NativeSession, NativeStatement};
pub use crate::options::{Attribute, AttributeValue, CacheOptions, CacheOptionsBuilder};
pub use crate::processor::{CacheProcessor, Processor};
pub use crate::query::QueryAndParams;
pub use crate::query_builder::QueryBuilder;
pub use crate::registry::{Strategies, StrategyRegistry};
pub use crate::results::{BothRow, FetchedRow, Record, ResultSet, Row, RowKey};
pub use crate::statement::{FetchMode, FetchPolicy, PreparedStatement};
pub use crate::translation::{PositionalSql, split_statements, to_positional};
pub use crate::types::{ParamKey, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::native::SqliteDriver;

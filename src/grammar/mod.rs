//! SQL text generation for the Caché dialect.
//!
//! [`DialectContext`] is the portable description of a select; a [`Grammar`]
//! turns it into dialect SQL. [`SelectQuery`] is the fluent way to build one.

use std::borrow::Cow;
use std::fmt;

mod ansi;
mod blueprint;
mod cache;
mod schema;
mod select;

pub use ansi::AnsiSelectCompiler;
pub use blueprint::{
    Blueprint, ColumnDefinition, ColumnType, Command, DefaultValue, ForeignKeyDefinition,
    IndexKind,
};
pub use cache::CacheGrammar;
pub use schema::{CacheSchemaGrammar, SchemaGrammar};
pub use select::SelectQuery;

/// Sort direction of one ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Column { column: String, direction: Direction },
    /// Emitted verbatim
    Raw(String),
}

/// Row limit of a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Rows(u64),
    All,
}

/// Portable description of one select statement.
///
/// `wheres` and `havings` hold already compiled predicate text (without the
/// leading keyword). An absent limit together with an offset means "all
/// remaining rows".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialectContext {
    /// Empty means `*`
    pub columns: Vec<String>,
    pub distinct: bool,
    pub from: String,
    pub wheres: Option<String>,
    pub groups: Vec<String>,
    pub havings: Option<String>,
    pub orders: Vec<OrderBy>,
    pub limit: Option<Limit>,
    pub offset: Option<u64>,
}

impl DialectContext {
    #[must_use]
    pub fn table(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    /// Whether the offset forces windowed pagination.
    #[must_use]
    pub fn needs_window(&self) -> bool {
        self.offset.is_some_and(|offset| offset > 0)
    }
}

/// Turns a [`DialectContext`] into SQL text.
///
/// Implementations are pure; they never touch a connection.
pub trait Grammar: fmt::Debug + Send + Sync {
    fn compile_select(&self, ctx: &DialectContext) -> String;

    /// Quote an identifier for this dialect.
    fn wrap<'a>(&self, value: &'a str) -> Cow<'a, str>;

    fn wrap_table<'a>(&self, table: &'a str) -> Cow<'a, str> {
        self.wrap(table)
    }

    /// Placeholder emitted for a bound value.
    fn parameter(&self) -> &'static str {
        "?"
    }
}

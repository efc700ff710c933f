use crate::connection::Connection;
use crate::query::QueryAndParams;
use crate::statement::{FetchMode, PreparedStatement};
use crate::types::{ParamKey, RowValues};

mod dml;
mod select;

/// Fluent builder for one statement on a [`Connection`].
///
/// ```rust,no_run
/// use cache_sql_middleware::prelude::*;
///
/// # fn demo(conn: &Connection) -> Result<(), CacheDbError> {
/// let rows = conn
///     .query("select id, email from users where age > :age")
///     .bind("age", 21)
///     .select()?;
/// for row in &rows {
///     let _ = row.get("email");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryBuilder<'conn> {
    pub(crate) conn: &'conn Connection,
    pub(crate) sql: String,
    pub(crate) params: Vec<(ParamKey, RowValues)>,
    pub(crate) fetch_mode: Option<FetchMode>,
}

impl<'conn> QueryBuilder<'conn> {
    pub(crate) fn new(conn: &'conn Connection, sql: &str) -> Self {
        Self {
            conn,
            sql: sql.to_string(),
            params: Vec::new(),
            fetch_mode: None,
        }
    }

    /// Builder over a query and its positional parameters.
    #[must_use]
    pub fn from_query(conn: &'conn Connection, query: &QueryAndParams) -> Self {
        Self {
            conn,
            sql: query.query.clone(),
            params: query.keyed_params(),
            fetch_mode: None,
        }
    }

    /// Bind one value to a `:name` marker or a 1-based `?` position.
    #[must_use]
    pub fn bind(mut self, key: impl Into<ParamKey>, value: impl Into<RowValues>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Bind several values at once.
    #[must_use]
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<ParamKey>,
        V: Into<RowValues>,
    {
        self.params
            .extend(params.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Fetch mode for [`QueryBuilder::fetch_all`]; the connection default otherwise.
    #[must_use]
    pub fn fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch_mode = Some(mode);
        self
    }

    pub(crate) fn prepare_bound(&self) -> PreparedStatement<'conn> {
        let mut stmt = self.conn.prepare(&self.sql);
        stmt.bind_values(self.params.iter().cloned());
        stmt
    }
}

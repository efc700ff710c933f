use crate::connection::collect_result_set;
use crate::error::CacheDbError;
use crate::results::{FetchedRow, ResultSet};

use super::QueryBuilder;

impl QueryBuilder<'_> {
    /// Execute a select and return the rows in associative form.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn select(self) -> Result<ResultSet, CacheDbError> {
        let mut stmt = self.prepare_bound();
        stmt.execute()?;
        collect_result_set(&mut stmt)
    }

    /// Execute and drain every row in the builder's fetch mode.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn fetch_all(self) -> Result<Vec<FetchedRow>, CacheDbError> {
        let mode = self
            .fetch_mode
            .unwrap_or(self.conn.options().default_fetch_mode);
        let mut stmt = self.prepare_bound();
        stmt.execute()?;
        stmt.fetch_all(mode)?;
        Ok(stmt.take_buffered())
    }

    /// Execute and return the first row, if any.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn first(self) -> Result<Option<FetchedRow>, CacheDbError> {
        let mode = self
            .fetch_mode
            .unwrap_or(self.conn.options().default_fetch_mode);
        let mut stmt = self.prepare_bound();
        stmt.execute()?;
        stmt.fetch_with(mode)
    }
}

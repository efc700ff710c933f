use crate::error::CacheDbError;
use crate::translation::split_statements;

use super::QueryBuilder;

impl QueryBuilder<'_> {
    /// Execute a DML statement and return rows affected.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn dml(self) -> Result<u64, CacheDbError> {
        let mut stmt = self.prepare_bound();
        stmt.execute()?;
        let count = stmt.row_count()?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Execute a `;`-separated script one statement at a time.
    ///
    /// Bound parameters are offered to every statement. Stops at the first
    /// failure and returns the summed affected row count otherwise.
    ///
    /// # Errors
    /// The first `PrepareError` or `ExecuteError`.
    pub fn batch(self) -> Result<u64, CacheDbError> {
        let mut total = 0u64;
        for sql in split_statements(&self.sql) {
            tracing::debug!(sql, "batch statement");
            let mut stmt = self.conn.prepare(sql);
            stmt.bind_values(self.params.iter().cloned());
            stmt.execute()?;
            total += u64::try_from(stmt.row_count()?).unwrap_or(0);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, NativeDiagnostic};
    use crate::options::CacheOptions;
    use crate::test_utils::{ScriptedDriver, ScriptedResult, scripted_connection};
    use crate::types::RowValues;

    #[test]
    fn dml_reports_affected_rows() {
        let driver = ScriptedDriver::new()
            .on("update users set active = ? where id = ?", ScriptedResult::affected(1));
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let affected = conn
            .query("update users set active = :active where id = :id")
            .bind("id", 7)
            .bind("active", true)
            .dml()
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(
            driver.executed()[0].1,
            vec![RowValues::Bool(true), RowValues::Int(7)]
        );
    }

    #[test]
    fn batch_runs_each_statement() {
        let driver = ScriptedDriver::new()
            .on("delete from a", ScriptedResult::affected(2))
            .on("delete from b", ScriptedResult::affected(3));
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        assert_eq!(conn.query("delete from a; delete from b;").batch().unwrap(), 5);
    }

    #[test]
    fn batch_stops_at_first_failure() {
        let driver = ScriptedDriver::new().fail_execute(
            "delete from a",
            NativeDiagnostic::new("42S02", -30, "Table A not found"),
        );
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let err = conn
            .query("delete from a; delete from b")
            .batch()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execute);
        assert_eq!(driver.executed().len(), 1);
    }
}

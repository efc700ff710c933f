//! Post-insert processing: fetching the id a table assigned to a new row.

use std::fmt::Debug;

use crate::connection::Connection;
use crate::error::CacheDbError;
use crate::grammar::SelectQuery;
use crate::statement::FetchMode;
use crate::types::{ParamKey, RowValues};

/// Column read when no sequence name is given.
pub const DEFAULT_SEQUENCE: &str = "id";

/// Reads back generated ids after an insert.
pub trait Processor: Debug + Send + Sync {
    /// Run `sql` with `params`, then return the newest value of `sequence`
    /// (default `id`) in `table`. `RowValues::Null` when the table is empty.
    ///
    /// # Errors
    /// Returns the prepare or execute error of either statement.
    fn insert_get_id(
        &self,
        conn: &Connection,
        sql: &str,
        params: &[(ParamKey, RowValues)],
        table: &str,
        sequence: Option<&str>,
    ) -> Result<RowValues, CacheDbError>;
}

/// Caché has no `last_insert_id`; the newest row is read back by `id desc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheProcessor;

impl CacheProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Numeric text becomes an integer; anything else is returned unchanged.
fn normalize_id(value: RowValues) -> RowValues {
    match value {
        RowValues::Text(text) => match text.trim().parse::<i64>() {
            Ok(id) => RowValues::Int(id),
            Err(_) => RowValues::Text(text),
        },
        other => other,
    }
}

impl Processor for CacheProcessor {
    fn insert_get_id(
        &self,
        conn: &Connection,
        sql: &str,
        params: &[(ParamKey, RowValues)],
        table: &str,
        sequence: Option<&str>,
    ) -> Result<RowValues, CacheDbError> {
        let mut insert = conn.prepare(sql);
        insert.bind_values(params.iter().cloned());
        insert.execute()?;

        let sequence = sequence.unwrap_or(DEFAULT_SEQUENCE);
        let newest = SelectQuery::table(table)
            .order_by_desc(DEFAULT_SEQUENCE)
            .take(1)
            .to_sql(conn.grammar());
        tracing::debug!(table, sequence, "reading back inserted id");

        let mut stmt = conn.prepare(&newest);
        stmt.execute()?;
        let Some(row) = stmt.fetch_with(FetchMode::Assoc)? else {
            return Ok(RowValues::Null);
        };
        let value = row
            .as_assoc()
            .and_then(|row| {
                row.iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(sequence))
                    .map(|(_, value)| value.clone())
            })
            .unwrap_or(RowValues::Null);
        Ok(normalize_id(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CacheOptions;
    use crate::test_utils::{ScriptedDriver, ScriptedResult, scripted_connection};

    const NEWEST: &str = "select top 1 * from users order by id desc";

    #[test]
    fn returns_newest_id_as_integer() {
        let driver = ScriptedDriver::new().on(
            NEWEST,
            ScriptedResult::new(&["ID", "Email"])
                .row(vec![RowValues::Text("42".into()), RowValues::Text("a@b".into())]),
        );
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let id = conn
            .insert_get_id(
                "insert into users (email) values ( :email )",
                &[(ParamKey::named("email"), RowValues::Text("a@b".into()))],
                "users",
                None,
            )
            .unwrap();
        assert_eq!(id, RowValues::Int(42));

        let executed = driver.executed();
        assert_eq!(executed[0].0, "insert into users (email) values ( ? )");
        assert_eq!(executed[0].1, vec![RowValues::Text("a@b".into())]);
        assert_eq!(executed[1].0, NEWEST);
    }

    #[test]
    fn custom_sequence_column() {
        let driver = ScriptedDriver::new().on(
            NEWEST,
            ScriptedResult::new(&["id", "code"])
                .row(vec![RowValues::Int(1), RowValues::Text("A-1".into())]),
        );
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let id = conn
            .insert_get_id("insert into users default values", &[], "users", Some("CODE"))
            .unwrap();
        assert_eq!(id, RowValues::Text("A-1".into()));
    }

    #[test]
    fn empty_table_yields_null() {
        let driver = ScriptedDriver::new();
        let conn = scripted_connection(&driver, CacheOptions::default()).unwrap();
        let id = conn
            .insert_get_id("insert into users default values", &[], "users", None)
            .unwrap();
        assert_eq!(id, RowValues::Null);
    }
}

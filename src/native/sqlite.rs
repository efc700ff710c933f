//! `SQLite` implementation of the native call-level interface.
//!
//! Lets the adapter run end-to-end without a Cache server. Semantics follow
//! the CLI contract: calls report success as a flag and record diagnostics,
//! manual-commit mode opens a transaction lazily on the next execute, and
//! result sets are materialized at execute time so the statement can act as
//! its own cursor.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, params_from_iter};

use super::{Credentials, NativeDriver, NativeField, NativeRow, NativeSession, NativeStatement};
use crate::error::NativeDiagnostic;
use crate::types::RowValues;

struct SessionState {
    conn: Connection,
    autocommit: bool,
    last_error: Option<NativeDiagnostic>,
}

type SharedSession = Arc<Mutex<SessionState>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Driver opening `SQLite` databases.
///
/// The endpoint is either a plain path, `:memory:`, or a connection string
/// carrying a `DATABASE=<path>` pair.
#[derive(Debug, Default)]
pub struct SqliteDriver {
    last_error: Mutex<Option<NativeDiagnostic>>,
}

impl SqliteDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn database_path(endpoint: &str) -> &str {
    endpoint
        .split(';')
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("database")
                .then_some(value.trim())
        })
        .unwrap_or_else(|| endpoint.trim())
}

impl NativeDriver for SqliteDriver {
    fn connect(&self, endpoint: &str, _credentials: &Credentials) -> Option<Box<dyn NativeSession>> {
        let path = database_path(endpoint);
        let opened = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        };
        let mut last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match opened {
            Ok(conn) => {
                *last_error = None;
                Some(Box::new(SqliteSession {
                    shared: Arc::new(Mutex::new(SessionState {
                        conn,
                        autocommit: true,
                        last_error: None,
                    })),
                }))
            }
            Err(err) => {
                *last_error = Some(diagnostic_from(&err));
                None
            }
        }
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// An open `SQLite` session.
pub struct SqliteSession {
    shared: SharedSession,
}

impl SqliteSession {
    fn finish_transaction(&self, verb: &str) -> bool {
        let mut state = lock(&self.shared);
        if state.conn.is_autocommit() {
            // nothing pending
            return true;
        }
        match state.conn.execute_batch(verb) {
            Ok(()) => {
                state.last_error = None;
                true
            }
            Err(err) => {
                state.last_error = Some(diagnostic_from(&err));
                false
            }
        }
    }
}

impl NativeSession for SqliteSession {
    fn prepare(&self, sql: &str) -> Option<Box<dyn NativeStatement>> {
        let mut state = lock(&self.shared);
        let checked = state.conn.prepare(sql).map(|_| ());
        match checked {
            Ok(()) => Some(Box::new(SqliteStatement {
                session: Arc::clone(&self.shared),
                sql: sql.to_string(),
                columns: Arc::new(Vec::new()),
                cursor: VecDeque::new(),
                num_rows: -1,
                last_error: None,
            })),
            Err(err) => {
                state.last_error = Some(diagnostic_from(&err));
                None
            }
        }
    }

    fn set_autocommit(&self, enabled: bool) -> bool {
        let mut state = lock(&self.shared);
        state.autocommit = enabled;
        if !enabled {
            state.last_error = None;
        }
        true
    }

    fn commit(&self) -> bool {
        self.finish_transaction("COMMIT")
    }

    fn rollback(&self) -> bool {
        self.finish_transaction("ROLLBACK")
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        lock(&self.shared).last_error.clone()
    }
}

/// A prepared `SQLite` statement.
///
/// `rusqlite` statements borrow their connection, so the handle keeps the SQL
/// text and re-prepares it against the shared session on every execute.
pub struct SqliteStatement {
    session: SharedSession,
    sql: String,
    columns: Arc<Vec<String>>,
    cursor: VecDeque<Vec<RowValues>>,
    num_rows: i64,
    last_error: Option<NativeDiagnostic>,
}

struct Executed {
    columns: Vec<String>,
    rows: VecDeque<Vec<RowValues>>,
    num_rows: i64,
}

fn run(conn: &Connection, sql: &str, params: &[RowValues]) -> rusqlite::Result<Executed> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let values: Vec<Value> = params.iter().map(row_value_to_sqlite_value).collect();

    if columns.is_empty() {
        let changes = stmt.execute(params_from_iter(values.iter()))?;
        return Ok(Executed {
            columns,
            rows: VecDeque::new(),
            num_rows: i64::try_from(changes).unwrap_or(i64::MAX),
        });
    }

    let mut rows = VecDeque::new();
    let mut cursor = stmt.query(params_from_iter(values.iter()))?;
    while let Some(row) = cursor.next()? {
        let mut row_values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            row_values.push(sqlite_value_to_row_value(row.get::<_, Value>(idx)?));
        }
        rows.push_back(row_values);
    }
    let num_rows = i64::try_from(rows.len()).unwrap_or(i64::MAX);
    Ok(Executed {
        columns,
        rows,
        num_rows,
    })
}

impl NativeStatement for SqliteStatement {
    fn execute(&mut self, params: &[RowValues]) -> bool {
        self.cursor.clear();
        self.last_error = None;

        let mut state = lock(&self.session);
        if !state.autocommit
            && state.conn.is_autocommit()
            && let Err(err) = state.conn.execute_batch("BEGIN")
        {
            let diag = diagnostic_from(&err);
            state.last_error = Some(diag.clone());
            self.last_error = Some(diag);
            return false;
        }

        match run(&state.conn, &self.sql, params) {
            Ok(executed) => {
                state.last_error = None;
                self.columns = Arc::new(executed.columns);
                self.cursor = executed.rows;
                self.num_rows = executed.num_rows;
                true
            }
            Err(err) => {
                let diag = diagnostic_from(&err);
                state.last_error = Some(diag.clone());
                self.last_error = Some(diag);
                self.num_rows = -1;
                false
            }
        }
    }

    fn fetch_row(&mut self) -> Option<NativeRow> {
        let values = self.cursor.pop_front()?;
        Some(NativeRow {
            columns: Arc::clone(&self.columns),
            fields: values.into_iter().map(NativeField::Value).collect(),
        })
    }

    fn num_rows(&self) -> i64 {
        self.num_rows
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        self.last_error.clone()
    }
}

fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

fn sqlite_value_to_row_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}

fn sqlstate_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::ConstraintViolation => "23000",
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => "40001",
        ErrorCode::CannotOpen => "08001",
        _ => "HY000",
    }
}

fn diagnostic_from(err: &rusqlite::Error) -> NativeDiagnostic {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let text = message.clone().unwrap_or_else(|| failure.to_string());
            NativeDiagnostic::new(sqlstate_for(failure.code), failure.extended_code, &text)
        }
        other => NativeDiagnostic::new("HY000", 0, &other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Box<dyn NativeSession> {
        SqliteDriver::new()
            .connect(":memory:", &Credentials::default())
            .expect("in-memory sqlite opens")
    }

    #[test]
    fn endpoint_database_pair_is_used_as_path() {
        assert_eq!(
            database_path("Driver={SQLite};Server=x;PORT=1;DATABASE=/tmp/a.db"),
            "/tmp/a.db"
        );
        assert_eq!(database_path(":memory:"), ":memory:");
    }

    #[test]
    fn prepare_failure_leaves_diagnostic() {
        let session = session();
        assert!(session.prepare("selec nonsense").is_none());
        let diag = session.error_state().expect("diagnostic recorded");
        assert_eq!(diag.sqlstate, "HY000");
        assert!(diag.message.contains("syntax error"));
    }

    #[test]
    fn execute_and_fetch_rows() {
        let session = session();
        let mut ddl = session.prepare("create table t (id integer, name text)").unwrap();
        assert!(ddl.execute(&[]));

        let mut insert = session.prepare("insert into t values (?, ?)").unwrap();
        assert!(insert.execute(&[RowValues::Int(1), RowValues::Text("a".into())]));
        assert_eq!(insert.num_rows(), 1);

        let mut select = session.prepare("select id, name from t").unwrap();
        assert!(select.execute(&[]));
        let row = select.fetch_row().unwrap();
        assert_eq!(row.columns.as_slice(), ["id".to_string(), "name".to_string()]);
        assert!(matches!(row.fields[0], NativeField::Value(RowValues::Int(1))));
        assert!(select.fetch_row().is_none());
        assert!(select.error_state().is_none());
    }

    #[test]
    fn manual_mode_rolls_back() {
        let session = session();
        let mut ddl = session.prepare("create table t (id integer)").unwrap();
        assert!(ddl.execute(&[]));

        assert!(session.set_autocommit(false));
        let mut insert = session.prepare("insert into t values (1)").unwrap();
        assert!(insert.execute(&[]));
        assert!(session.rollback());
        assert!(session.set_autocommit(true));

        let mut select = session.prepare("select count(*) from t").unwrap();
        assert!(select.execute(&[]));
        let row = select.fetch_row().unwrap();
        assert!(matches!(row.fields[0], NativeField::Value(RowValues::Int(0))));
    }

    #[test]
    fn constraint_violation_maps_to_23000() {
        let session = session();
        let mut ddl = session.prepare("create table t (id integer primary key)").unwrap();
        assert!(ddl.execute(&[]));
        let mut insert = session.prepare("insert into t values (?)").unwrap();
        assert!(insert.execute(&[RowValues::Int(1)]));
        assert!(!insert.execute(&[RowValues::Int(1)]));
        assert_eq!(insert.error_state().unwrap().sqlstate, "23000");
        assert!(session.error_state().is_some());
    }
}

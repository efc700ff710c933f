//! In-memory native layer driven by a script.
//!
//! Statements are matched on their native SQL text (after `:name` markers
//! were rewritten to `?`). Unscripted SQL executes successfully with no rows.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::NativeDiagnostic;
use crate::native::{
    Credentials, NativeDriver, NativeField, NativeRow, NativeSession, NativeStatement,
};
use crate::types::RowValues;

/// One native call, as recorded in the journal.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Connect { endpoint: String, persistent: bool },
    Prepare(String),
    Execute { sql: String, params: Vec<RowValues> },
    SetAutocommit(bool),
    Commit,
    Rollback,
}

/// A row of a scripted result: plain values or a nested cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedRow {
    Values(Vec<RowValues>),
    Cursor(ScriptedResult),
}

/// Canned result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedResult {
    columns: Vec<String>,
    rows: Vec<ScriptedRow>,
    affected: Option<i64>,
}

impl ScriptedResult {
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: Vec::new(),
            affected: None,
        }
    }

    /// A statement that returns no rows and reports `count` affected rows.
    #[must_use]
    pub fn affected(count: i64) -> Self {
        Self {
            affected: Some(count),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn row(mut self, values: Vec<RowValues>) -> Self {
        self.rows.push(ScriptedRow::Values(values));
        self
    }

    /// A row whose leading field is a cursor over `nested`.
    #[must_use]
    pub fn cursor(mut self, nested: ScriptedResult) -> Self {
        self.rows.push(ScriptedRow::Cursor(nested));
        self
    }

    fn num_rows(&self) -> i64 {
        self.affected
            .unwrap_or_else(|| i64::try_from(self.rows.len()).unwrap_or(i64::MAX))
    }
}

#[derive(Debug)]
struct Script {
    results: HashMap<String, ScriptedResult>,
    prepare_failures: HashMap<String, NativeDiagnostic>,
    execute_failures: HashMap<String, NativeDiagnostic>,
    connect_failure: Option<NativeDiagnostic>,
    connect_error: Option<NativeDiagnostic>,
    session_error: Option<NativeDiagnostic>,
    commit_result: bool,
    rollback_result: bool,
    journal: Vec<NativeCall>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            results: HashMap::new(),
            prepare_failures: HashMap::new(),
            execute_failures: HashMap::new(),
            connect_failure: None,
            connect_error: None,
            session_error: None,
            commit_result: true,
            rollback_result: true,
            journal: Vec::new(),
        }
    }
}

type SharedScript = Arc<Mutex<Script>>;

fn lock(script: &SharedScript) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted driver; clones share the same script and journal.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: SharedScript,
}

impl ScriptedDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` (native text) with `result`.
    #[must_use]
    pub fn on(self, sql: &str, result: ScriptedResult) -> Self {
        lock(&self.script).results.insert(sql.to_string(), result);
        self
    }

    #[must_use]
    pub fn fail_prepare(self, sql: &str, diag: NativeDiagnostic) -> Self {
        lock(&self.script)
            .prepare_failures
            .insert(sql.to_string(), diag);
        self
    }

    #[must_use]
    pub fn fail_execute(self, sql: &str, diag: NativeDiagnostic) -> Self {
        lock(&self.script)
            .execute_failures
            .insert(sql.to_string(), diag);
        self
    }

    #[must_use]
    pub fn fail_connect(self, diag: NativeDiagnostic) -> Self {
        lock(&self.script).connect_failure = Some(diag);
        self
    }

    /// Native result of `commit`; a failing commit leaves a diagnostic behind.
    #[must_use]
    pub fn commit_result(self, ok: bool) -> Self {
        lock(&self.script).commit_result = ok;
        self
    }

    /// Native result of `rollback`. A failing rollback keeps whatever error
    /// state the session already has.
    #[must_use]
    pub fn rollback_result(self, ok: bool) -> Self {
        lock(&self.script).rollback_result = ok;
        self
    }

    /// Force the session error state, as if a previous call had failed.
    pub fn set_session_error(&self, diag: Option<NativeDiagnostic>) {
        lock(&self.script).session_error = diag;
    }

    #[must_use]
    pub fn session_error(&self) -> Option<NativeDiagnostic> {
        lock(&self.script).session_error.clone()
    }

    #[must_use]
    pub fn journal(&self) -> Vec<NativeCall> {
        lock(&self.script).journal.clone()
    }

    pub fn clear_journal(&self) {
        lock(&self.script).journal.clear();
    }

    /// Parameters of every `execute` call, in call order.
    #[must_use]
    pub fn executed(&self) -> Vec<(String, Vec<RowValues>)> {
        lock(&self.script)
            .journal
            .iter()
            .filter_map(|call| match call {
                NativeCall::Execute { sql, params } => Some((sql.clone(), params.clone())),
                _ => None,
            })
            .collect()
    }

    fn open(&self, endpoint: &str, persistent: bool) -> Option<Box<dyn NativeSession>> {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::Connect {
            endpoint: endpoint.to_string(),
            persistent,
        });
        if let Some(diag) = script.connect_failure.clone() {
            script.connect_error = Some(diag);
            return None;
        }
        script.connect_error = None;
        Some(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
        }))
    }
}

impl NativeDriver for ScriptedDriver {
    fn connect(&self, endpoint: &str, _credentials: &Credentials) -> Option<Box<dyn NativeSession>> {
        self.open(endpoint, false)
    }

    fn pconnect(&self, endpoint: &str, _credentials: &Credentials) -> Option<Box<dyn NativeSession>> {
        self.open(endpoint, true)
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        lock(&self.script).connect_error.clone()
    }
}

struct ScriptedSession {
    script: SharedScript,
}

impl NativeSession for ScriptedSession {
    fn prepare(&self, sql: &str) -> Option<Box<dyn NativeStatement>> {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::Prepare(sql.to_string()));
        if let Some(diag) = script.prepare_failures.get(sql).cloned() {
            script.session_error = Some(diag);
            return None;
        }
        Some(Box::new(ScriptedStatement::new(
            Arc::clone(&self.script),
            sql.to_string(),
            None,
        )))
    }

    fn set_autocommit(&self, enabled: bool) -> bool {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::SetAutocommit(enabled));
        if !enabled {
            script.session_error = None;
        }
        true
    }

    fn commit(&self) -> bool {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::Commit);
        if script.commit_result {
            script.session_error = None;
        } else {
            script.session_error = Some(NativeDiagnostic::new("40003", 0, "commit failed"));
        }
        script.commit_result
    }

    fn rollback(&self) -> bool {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::Rollback);
        if script.rollback_result {
            script.session_error = None;
        }
        script.rollback_result
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        lock(&self.script).session_error.clone()
    }
}

const CURSOR_SQL: &str = "<cursor>";

struct ScriptedStatement {
    script: SharedScript,
    sql: String,
    // set for statements opened over a nested cursor
    preset: Option<ScriptedResult>,
    columns: Arc<Vec<String>>,
    pending: VecDeque<ScriptedRow>,
    num_rows: i64,
    last_error: Option<NativeDiagnostic>,
}

impl ScriptedStatement {
    fn new(script: SharedScript, sql: String, preset: Option<ScriptedResult>) -> Self {
        Self {
            script,
            sql,
            preset,
            columns: Arc::new(Vec::new()),
            pending: VecDeque::new(),
            num_rows: -1,
            last_error: None,
        }
    }
}

impl NativeStatement for ScriptedStatement {
    fn execute(&mut self, params: &[RowValues]) -> bool {
        let mut script = lock(&self.script);
        script.journal.push(NativeCall::Execute {
            sql: self.sql.clone(),
            params: params.to_vec(),
        });
        self.pending.clear();

        if let Some(diag) = script.execute_failures.get(&self.sql).cloned() {
            script.session_error = Some(diag.clone());
            self.last_error = Some(diag);
            self.num_rows = -1;
            return false;
        }

        let result = match &self.preset {
            Some(result) => result.clone(),
            None => script.results.get(&self.sql).cloned().unwrap_or_default(),
        };
        script.session_error = None;
        self.last_error = None;
        self.num_rows = result.num_rows();
        self.columns = Arc::new(result.columns);
        self.pending = result.rows.into();
        true
    }

    fn fetch_row(&mut self) -> Option<NativeRow> {
        let row = self.pending.pop_front()?;
        let fields = match row {
            ScriptedRow::Values(values) => values.into_iter().map(NativeField::Value).collect(),
            ScriptedRow::Cursor(nested) => {
                vec![NativeField::Cursor(Box::new(ScriptedStatement::new(
                    Arc::clone(&self.script),
                    CURSOR_SQL.to_string(),
                    Some(nested),
                )))]
            }
        };
        Some(NativeRow {
            columns: Arc::clone(&self.columns),
            fields,
        })
    }

    fn num_rows(&self) -> i64 {
        self.num_rows
    }

    fn error_state(&self) -> Option<NativeDiagnostic> {
        self.last_error.clone()
    }
}

//! The call-level interface the adapter drives.
//!
//! The native layer mirrors an ODBC-style CLI: calls never raise, they return
//! a success flag (or an optional handle) and leave a [`NativeDiagnostic`] in
//! the handle's error state. The adapter is responsible for checking that state
//! after every call.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeDiagnostic;
use crate::types::RowValues;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

/// Username/password pair handed to the native connect call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One field of a fetched native row.
pub enum NativeField {
    Value(RowValues),
    /// A secondary result set returned in place of a value (stored procedures).
    Cursor(Box<dyn NativeStatement>),
}

impl fmt::Debug for NativeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeField::Value(value) => f.debug_tuple("Value").field(value).finish(),
            NativeField::Cursor(_) => f.write_str("Cursor(<native statement>)"),
        }
    }
}

/// A row as the native layer hands it out, before any fetch-mode shaping.
#[derive(Debug)]
pub struct NativeRow {
    pub columns: Arc<Vec<String>>,
    pub fields: Vec<NativeField>,
}

impl NativeRow {
    /// Take the cursor out of the row when its leading field carries one.
    pub(crate) fn take_leading_cursor(&mut self) -> Option<Box<dyn NativeStatement>> {
        if !matches!(self.fields.first(), Some(NativeField::Cursor(_))) {
            return None;
        }
        match self.fields.remove(0) {
            NativeField::Cursor(cursor) => Some(cursor),
            NativeField::Value(_) => None,
        }
    }
}

/// Entry point of a native driver.
pub trait NativeDriver {
    /// Open a session; `None` on failure with the diagnostic in [`NativeDriver::error_state`].
    fn connect(&self, endpoint: &str, credentials: &Credentials) -> Option<Box<dyn NativeSession>>;

    /// Open a persistent session. Drivers without persistence fall back to `connect`.
    fn pconnect(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Option<Box<dyn NativeSession>> {
        self.connect(endpoint, credentials)
    }

    /// Diagnostic of the last failed connect.
    fn error_state(&self) -> Option<NativeDiagnostic>;
}

/// An open native session (the connection handle).
pub trait NativeSession {
    /// Prepare `sql` (positional `?` markers only); `None` on failure.
    fn prepare(&self, sql: &str) -> Option<Box<dyn NativeStatement>>;

    fn set_autocommit(&self, enabled: bool) -> bool;

    fn commit(&self) -> bool;

    fn rollback(&self) -> bool;

    /// Diagnostic left by the last failed call on this session or its statements.
    fn error_state(&self) -> Option<NativeDiagnostic>;
}

/// A prepared native statement; doubles as the result cursor once executed.
pub trait NativeStatement {
    /// Execute with positional parameters.
    fn execute(&mut self, params: &[RowValues]) -> bool;

    /// Advance the cursor; `None` when exhausted or on failure.
    fn fetch_row(&mut self) -> Option<NativeRow>;

    /// Rows affected by the last execute (approximate for reads on some drivers).
    fn num_rows(&self) -> i64;

    /// Diagnostic left by the last failed call on this statement.
    fn error_state(&self) -> Option<NativeDiagnostic>;
}

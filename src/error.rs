use std::fmt;

use thiserror::Error;

/// Diagnostic left behind by a failed native call.
///
/// The native layer never raises; it records `(sqlstate, code, message)` and
/// reports failure through its return value. Messages are normalized on
/// construction so they are always a single line without double quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDiagnostic {
    pub sqlstate: String,
    pub code: i32,
    pub message: String,
}

/// SQLSTATE used for adapter-side sequence errors (e.g. fetch before execute).
pub const SEQUENCE_ERROR_STATE: &str = "HY010";

impl NativeDiagnostic {
    #[must_use]
    pub fn new(sqlstate: impl Into<String>, code: i32, message: &str) -> Self {
        Self {
            sqlstate: sqlstate.into(),
            code,
            message: normalize_message(message),
        }
    }

    /// Diagnostic raised by the adapter itself rather than the native layer.
    #[must_use]
    pub fn adapter(message: &str) -> Self {
        Self::new(SEQUENCE_ERROR_STATE, 0, message)
    }
}

impl fmt::Display for NativeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sqlstate.is_empty() {
            write!(f, "{} (code {})", self.message, self.code)
        } else {
            write!(f, "[{}] {} (code {})", self.sqlstate, self.message, self.code)
        }
    }
}

/// Strip double quotes and fold newlines into ` - ` so a native message fits on one line.
#[must_use]
pub fn normalize_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for ch in message.chars() {
        match ch {
            '"' => {}
            '\n' => out.push_str(" - "),
            _ => out.push(ch),
        }
    }
    out
}

/// Coarse error category, for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Prepare,
    Execute,
    UnsupportedFetchMode,
    Transaction,
    Config,
}

#[derive(Debug, Error)]
pub enum CacheDbError {
    #[error("Connection error: {0}")]
    ConnectionError(NativeDiagnostic),

    #[error("Prepare error: {0}")]
    PrepareError(NativeDiagnostic),

    #[error("SQL execution error: {0}")]
    ExecuteError(NativeDiagnostic),

    #[error("Requested fetch mode is not yet supported: {0}")]
    UnsupportedFetchMode(String),

    #[error("Transaction error: {0}")]
    TransactionError(NativeDiagnostic),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CacheDbError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheDbError::ConnectionError(_) => ErrorKind::Connection,
            CacheDbError::PrepareError(_) => ErrorKind::Prepare,
            CacheDbError::ExecuteError(_) => ErrorKind::Execute,
            CacheDbError::UnsupportedFetchMode(_) => ErrorKind::UnsupportedFetchMode,
            CacheDbError::TransactionError(_) => ErrorKind::Transaction,
            CacheDbError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// The native diagnostic behind this error, if it came from the native layer.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&NativeDiagnostic> {
        match self {
            CacheDbError::ConnectionError(diag)
            | CacheDbError::PrepareError(diag)
            | CacheDbError::ExecuteError(diag)
            | CacheDbError::TransactionError(diag) => Some(diag),
            CacheDbError::UnsupportedFetchMode(_) | CacheDbError::ConfigError(_) => None,
        }
    }

    /// Native error code; `0` for adapter-side errors.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.diagnostic().map_or(0, |diag| diag.code)
    }

    /// The single-line error message, without the category prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            CacheDbError::UnsupportedFetchMode(mode) => {
                format!("Requested fetch mode is not yet supported: {mode}")
            }
            CacheDbError::ConfigError(msg) => normalize_message(msg),
            other => other
                .diagnostic()
                .map(|diag| diag.message.clone())
                .unwrap_or_default(),
        }
    }
}

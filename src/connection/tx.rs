use crate::error::{CacheDbError, NativeDiagnostic};
use crate::native::NativeSession;

/// Transaction state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    #[default]
    AutoCommit,
    Manual,
}

/// Two-state machine over the native autocommit switch.
///
/// With explicit markers enabled, `START TRANSACTION` / `COMMIT` /
/// `ROLLBACK` are executed as statements alongside the native calls.
#[derive(Debug, Default)]
pub(crate) struct TransactionController {
    state: TxState,
}

fn session_failure(session: &dyn NativeSession, fallback: &str) -> NativeDiagnostic {
    session
        .error_state()
        .unwrap_or_else(|| NativeDiagnostic::adapter(fallback))
}

/// Run a bracketing statement directly on the session.
fn run_marker(session: &dyn NativeSession, sql: &str) -> Result<(), CacheDbError> {
    let Some(mut stmt) = session.prepare(sql) else {
        return Err(CacheDbError::TransactionError(session_failure(
            session,
            "transaction marker could not be prepared",
        )));
    };
    if !stmt.execute(&[]) {
        let diag = stmt
            .error_state()
            .unwrap_or_else(|| session_failure(session, "transaction marker failed"));
        return Err(CacheDbError::TransactionError(diag));
    }
    Ok(())
}

impl TransactionController {
    pub(crate) fn state(&self) -> TxState {
        self.state
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.state == TxState::Manual
    }

    pub(crate) fn begin(
        &mut self,
        session: &dyn NativeSession,
        markers: bool,
    ) -> Result<bool, CacheDbError> {
        if !session.set_autocommit(false) {
            return Err(CacheDbError::TransactionError(session_failure(
                session,
                "autocommit could not be disabled",
            )));
        }
        self.state = TxState::Manual;
        if markers {
            if let Err(err) = run_marker(session, "START TRANSACTION") {
                session.set_autocommit(true);
                self.state = TxState::AutoCommit;
                return Err(err);
            }
        }
        tracing::debug!(markers, "transaction started");
        Ok(true)
    }

    /// Commit, or roll back when the session carries an error from earlier work.
    pub(crate) fn commit(
        &mut self,
        session: &dyn NativeSession,
        markers: bool,
    ) -> Result<bool, CacheDbError> {
        if markers {
            // a failed COMMIT leaves its diagnostic for the check below
            if let Err(err) = run_marker(session, "COMMIT") {
                tracing::debug!(%err, "COMMIT marker failed");
            }
        }
        session.set_autocommit(true);
        self.state = TxState::AutoCommit;

        match session.error_state() {
            None => {
                let committed = session.commit();
                tracing::debug!(committed, "transaction committed");
                Ok(committed)
            }
            Some(diag) => {
                tracing::warn!(%diag, "error state set at commit, rolling back");
                self.rollback(session, markers)
            }
        }
    }

    pub(crate) fn rollback(
        &mut self,
        session: &dyn NativeSession,
        markers: bool,
    ) -> Result<bool, CacheDbError> {
        // the native rollback runs even when the marker fails
        let marker_failure = if markers {
            run_marker(session, "ROLLBACK").err()
        } else {
            None
        };
        let rolled_back = session.rollback();
        let failure = if rolled_back {
            None
        } else {
            session.error_state()
        };
        session.set_autocommit(true);
        self.state = TxState::AutoCommit;
        tracing::debug!(rolled_back, "transaction rolled back");

        match (failure, marker_failure) {
            (Some(diag), _) => Err(CacheDbError::TransactionError(diag)),
            (None, Some(err)) => Err(err),
            (None, None) => Ok(rolled_back),
        }
    }
}

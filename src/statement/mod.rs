//! Prepared statements: parameter binding, execution and row fetching.

mod binder;
mod fetch;

pub use fetch::{FetchMode, FetchPolicy};

use binder::Binder;
use fetch::RowShaper;

use crate::connection::Connection;
use crate::error::{CacheDbError, NativeDiagnostic};
use crate::native::{NativeRow, NativeStatement};
use crate::results::FetchedRow;
use crate::translation::to_positional;
use crate::types::{ParamKey, RowValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Idle,
    Executed,
    Exhausted,
}

/// Convert the error state left by a statement call into a typed error.
///
/// `ok` is the flag the native call returned; a failed call without a
/// diagnostic still becomes an error.
pub(crate) fn check_statement(
    handle: &dyn NativeStatement,
    ok: bool,
    wrap: fn(NativeDiagnostic) -> CacheDbError,
) -> Result<(), CacheDbError> {
    match handle.error_state() {
        Some(diag) => Err(wrap(diag)),
        None if !ok => Err(wrap(NativeDiagnostic::new(
            "HY000",
            0,
            "native call failed without a diagnostic",
        ))),
        None => Ok(()),
    }
}

/// A statement prepared on a [`Connection`].
///
/// Named `:markers` are rewritten to `?` before the native prepare. A native
/// prepare failure is kept and reported as `PrepareError` by the first call
/// that touches the statement.
///
/// ```rust,no_run
/// use cache_sql_middleware::prelude::*;
///
/// # fn demo(conn: &Connection) -> Result<(), CacheDbError> {
/// let mut stmt = conn.prepare("select id, name from users where id = :id");
/// stmt.bind_value(":id", 7);
/// stmt.execute()?;
/// while let Some(row) = stmt.fetch()? {
///     let _ = row.get("name");
/// }
/// # Ok(())
/// # }
/// ```
pub struct PreparedStatement<'conn> {
    conn: &'conn Connection,
    sql: String,
    native_sql: String,
    handle: Result<Box<dyn NativeStatement>, NativeDiagnostic>,
    binder: Binder,
    fetch_mode: FetchMode,
    shaper: RowShaper,
    state: CursorState,
    nested: Option<Box<PreparedStatement<'conn>>>,
    buffer: Vec<FetchedRow>,
}

impl<'conn> PreparedStatement<'conn> {
    pub(crate) fn new(conn: &'conn Connection, sql: &str) -> Self {
        let positional = to_positional(sql);
        let native_sql = positional.sql.to_string();
        tracing::debug!(sql, native_sql = %native_sql, "prepare");

        let session = conn.native_session();
        let handle = session.prepare(&native_sql).ok_or_else(|| {
            session.error_state().unwrap_or_else(|| {
                NativeDiagnostic::new("HY000", 0, "native prepare failed without a diagnostic")
            })
        });
        if let Err(diag) = &handle {
            tracing::debug!(%diag, "native prepare failed");
        }

        let options = conn.options();
        Self {
            conn,
            sql: sql.to_string(),
            native_sql,
            handle,
            binder: Binder::new(&positional),
            fetch_mode: options.default_fetch_mode,
            shaper: RowShaper::new(options.fetch_policy()),
            state: CursorState::Idle,
            nested: None,
            buffer: Vec::new(),
        }
    }

    /// Statement over a cursor handed out inside a row.
    fn over_cursor(
        conn: &'conn Connection,
        handle: Box<dyn NativeStatement>,
        fetch_mode: FetchMode,
    ) -> Self {
        Self {
            conn,
            sql: String::new(),
            native_sql: String::new(),
            handle: Ok(handle),
            binder: Binder::default(),
            fetch_mode,
            shaper: RowShaper::new(conn.options().fetch_policy()),
            state: CursorState::Idle,
            nested: None,
            buffer: Vec::new(),
        }
    }

    /// SQL text as given to `prepare`.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SQL text as sent to the native layer, with positional markers only.
    #[must_use]
    pub fn native_sql(&self) -> &str {
        &self.native_sql
    }

    /// Distinct marker keys in order of first appearance.
    #[must_use]
    pub fn parameter_slots(&self) -> &[ParamKey] {
        self.binder.slots()
    }

    /// Bind a value to a `:name` marker (colon optional) or a 1-based `?` position.
    ///
    /// Keys no marker references are accepted and ignored at execute.
    pub fn bind_value(
        &mut self,
        key: impl Into<ParamKey>,
        value: impl Into<RowValues>,
    ) -> &mut Self {
        self.binder.bind(key.into(), value.into());
        self
    }

    pub fn bind_values<K, V>(&mut self, params: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<ParamKey>,
        V: Into<RowValues>,
    {
        for (key, value) in params {
            self.binder.bind(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub fn set_fetch_mode(&mut self, mode: FetchMode) {
        self.fetch_mode = mode;
    }

    /// Select the fetch mode by its numeric code.
    ///
    /// # Errors
    /// Returns `CacheDbError::UnsupportedFetchMode` for codes other than 2, 4 and 5.
    pub fn set_fetch_mode_code(&mut self, code: i64) -> Result<(), CacheDbError> {
        self.fetch_mode = FetchMode::try_from(code)?;
        Ok(())
    }

    fn handle_mut(&mut self) -> Result<&mut Box<dyn NativeStatement>, CacheDbError> {
        self.handle
            .as_mut()
            .map_err(|diag| CacheDbError::PrepareError(diag.clone()))
    }

    /// Run the statement with the currently bound values, then clear them.
    ///
    /// Unbound markers are sent as NULL.
    ///
    /// # Errors
    /// Returns `PrepareError` if the native prepare had failed, or
    /// `ExecuteError` carrying the native diagnostic.
    pub fn execute(&mut self) -> Result<(), CacheDbError> {
        let params = self.binder.take_positional();
        self.nested = None;
        self.buffer.clear();
        self.state = CursorState::Idle;

        let handle = self.handle_mut()?;
        tracing::debug!(params = params.len(), "execute");
        let ok = handle.execute(&params);
        check_statement(&**handle, ok, CacheDbError::ExecuteError)?;
        self.state = CursorState::Executed;
        Ok(())
    }

    /// Bind `params` and execute.
    ///
    /// # Errors
    /// Same as [`PreparedStatement::execute`].
    pub fn execute_with<K, V>(
        &mut self,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), CacheDbError>
    where
        K: Into<ParamKey>,
        V: Into<RowValues>,
    {
        self.bind_values(params);
        self.execute()
    }

    fn next_native(&mut self) -> Result<Option<NativeRow>, CacheDbError> {
        let handle = self.handle_mut()?;
        let row = handle.fetch_row();
        check_statement(&**handle, true, CacheDbError::ExecuteError)?;
        Ok(row)
    }

    /// Fetch the next row in the statement's fetch mode.
    ///
    /// # Errors
    /// `PrepareError` if the native prepare had failed, `ExecuteError` when
    /// called before `execute` or when the native fetch fails.
    pub fn fetch(&mut self) -> Result<Option<FetchedRow>, CacheDbError> {
        self.fetch_with(self.fetch_mode)
    }

    /// Fetch the next row in `mode`, leaving the statement's mode unchanged.
    ///
    /// A row whose leading field is a cursor is replaced by the rows of that
    /// cursor, drained before the outer cursor advances.
    ///
    /// # Errors
    /// Same as [`PreparedStatement::fetch`].
    pub fn fetch_with(&mut self, mode: FetchMode) -> Result<Option<FetchedRow>, CacheDbError> {
        if let Err(diag) = &self.handle {
            return Err(CacheDbError::PrepareError(diag.clone()));
        }
        if self.state == CursorState::Idle {
            return Err(CacheDbError::ExecuteError(NativeDiagnostic::adapter(
                "fetch called before execute",
            )));
        }

        loop {
            if let Some(nested) = self.nested.as_mut() {
                if let Some(row) = nested.fetch_with(mode)? {
                    return Ok(Some(row));
                }
                self.nested = None;
            }
            if self.state == CursorState::Exhausted {
                return Ok(None);
            }

            let Some(mut row) = self.next_native()? else {
                self.state = CursorState::Exhausted;
                return Ok(None);
            };
            if let Some(cursor) = row.take_leading_cursor() {
                tracing::debug!("opening nested cursor");
                let mut nested = PreparedStatement::over_cursor(self.conn, cursor, mode);
                nested.execute()?;
                self.nested = Some(Box::new(nested));
                continue;
            }
            tracing::trace!(fields = row.fields.len(), "fetched row");
            return Ok(Some(self.shaper.shape(row, mode)));
        }
    }

    /// Fetch the next row with a mode given by numeric code.
    ///
    /// # Errors
    /// `UnsupportedFetchMode` for unknown codes, whatever the statement state;
    /// otherwise as [`PreparedStatement::fetch`].
    pub fn fetch_with_code(&mut self, code: i64) -> Result<Option<FetchedRow>, CacheDbError> {
        let mode = FetchMode::try_from(code)?;
        self.fetch_with(mode)
    }

    /// Set the fetch mode and drain the cursor into the statement's buffer.
    ///
    /// # Errors
    /// Same as [`PreparedStatement::fetch`].
    pub fn fetch_all(&mut self, mode: FetchMode) -> Result<&[FetchedRow], CacheDbError> {
        self.fetch_mode = mode;
        self.buffer.clear();
        while let Some(row) = self.fetch_with(mode)? {
            self.buffer.push(row);
        }
        Ok(&self.buffer)
    }

    /// Rows buffered by the last `fetch_all`.
    #[must_use]
    pub fn buffered(&self) -> &[FetchedRow] {
        &self.buffer
    }

    pub fn take_buffered(&mut self) -> Vec<FetchedRow> {
        std::mem::take(&mut self.buffer)
    }

    /// Native row count of the last execute. Exact for writes, best effort
    /// for reads; `-1` when the driver cannot tell.
    ///
    /// # Errors
    /// `PrepareError` if the native prepare had failed, `ExecuteError` if the
    /// native layer reports an error.
    pub fn row_count(&mut self) -> Result<i64, CacheDbError> {
        let handle = self.handle_mut()?;
        let count = handle.num_rows();
        check_statement(&**handle, true, CacheDbError::ExecuteError)?;
        Ok(count)
    }
}

impl std::fmt::Debug for PreparedStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("sql", &self.sql)
            .field("native_sql", &self.native_sql)
            .field("prepared", &self.handle.is_ok())
            .field("fetch_mode", &self.fetch_mode)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

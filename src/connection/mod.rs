//! The connection adapter: session ownership, attributes, statements and
//! transaction control.

mod schema;
mod tx;

pub use tx::TxState;

use tx::TransactionController;

use crate::config::ConnectionConfig;
use crate::error::{CacheDbError, NativeDiagnostic};
use crate::grammar::{Grammar, SchemaGrammar, SelectQuery};
use crate::native::{Credentials, NativeDriver, NativeSession};
use crate::options::{Attribute, AttributeValue, CacheOptions};
use crate::processor::Processor;
use crate::query_builder::QueryBuilder;
use crate::registry::{Strategies, StrategyRegistry};
use crate::results::{FetchedRow, ResultSet};
use crate::statement::{FetchMode, PreparedStatement};
use crate::types::{ParamKey, RowValues};

/// An open connection to a Caché server (or any other native driver).
///
/// Owns the native session for its whole life; statements borrow the
/// connection, so transaction control cannot interleave with a live cursor.
///
/// ```rust,no_run
/// use cache_sql_middleware::prelude::*;
///
/// # fn demo(driver: &dyn NativeDriver) -> Result<(), CacheDbError> {
/// let mut conn = CacheOptions::builder()
///     .lowercase_names(true)
///     .connect(driver, "CacheDSN", &Credentials::new("_SYSTEM", "SYS"))?;
/// conn.begin()?;
/// conn.query("update users set active = :active where id = :id")
///     .bind("active", true)
///     .bind("id", 7)
///     .dml()?;
/// conn.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    session: Box<dyn NativeSession>,
    options: CacheOptions,
    tx: TransactionController,
    strategies: Strategies,
    schema: Option<String>,
}

impl Connection {
    /// Open a session with the built-in Caché strategies.
    ///
    /// Uses the persistent native connect when `options.persistent` is set.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConnectionError` with the driver's diagnostic.
    pub fn connect(
        driver: &dyn NativeDriver,
        endpoint: &str,
        credentials: &Credentials,
        options: CacheOptions,
    ) -> Result<Self, CacheDbError> {
        Self::open(driver, endpoint, credentials, options, Strategies::default(), None)
    }

    /// Open a session described by a config entry.
    ///
    /// # Errors
    /// `ConfigError` for an incomplete entry or an unknown strategy key,
    /// checked before any native call; `ConnectionError` if the connect fails.
    pub fn from_config(
        driver: &dyn NativeDriver,
        config: &ConnectionConfig,
        registry: &StrategyRegistry,
    ) -> Result<Self, CacheDbError> {
        let endpoint = config.endpoint()?;
        let options = config.cache_options()?;
        let strategies = registry.resolve(
            config.query_grammar_key(),
            config.schema_grammar_key(),
            config.processor_key(),
        )?;
        Self::open(
            driver,
            &endpoint,
            &config.credentials(),
            options,
            strategies,
            config.schema.clone(),
        )
    }

    fn open(
        driver: &dyn NativeDriver,
        endpoint: &str,
        credentials: &Credentials,
        options: CacheOptions,
        strategies: Strategies,
        schema: Option<String>,
    ) -> Result<Self, CacheDbError> {
        tracing::debug!(endpoint, persistent = options.persistent, "connecting");
        let session = if options.persistent {
            driver.pconnect(endpoint, credentials)
        } else {
            driver.connect(endpoint, credentials)
        };
        let Some(session) = session else {
            let diag = driver
                .error_state()
                .unwrap_or_else(|| NativeDiagnostic::new("08001", 0, "native connect failed"));
            return Err(CacheDbError::ConnectionError(diag));
        };
        Ok(Self {
            session,
            options,
            tx: TransactionController::default(),
            strategies,
            schema,
        })
    }

    pub(crate) fn native_session(&self) -> &dyn NativeSession {
        &*self.session
    }

    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Schema used by the table helpers, from the config entry.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn set_schema(&mut self, schema: Option<String>) {
        self.schema = schema;
    }

    #[must_use]
    pub fn grammar(&self) -> &dyn Grammar {
        &*self.strategies.grammar
    }

    #[must_use]
    pub fn schema_grammar(&self) -> &dyn SchemaGrammar {
        &*self.strategies.schema_grammar
    }

    #[must_use]
    pub fn processor(&self) -> &dyn Processor {
        &*self.strategies.processor
    }

    /// Prepare `sql`. Never fails here; a native prepare failure is
    /// reported by the first operation on the statement.
    #[must_use]
    pub fn prepare(&self, sql: &str) -> PreparedStatement<'_> {
        PreparedStatement::new(self, sql)
    }

    /// Prepare and execute `sql` without parameters, returning the affected row count.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn exec(&self, sql: &str) -> Result<u64, CacheDbError> {
        let mut stmt = self.prepare(sql);
        stmt.execute()?;
        let count = stmt.row_count()?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Fluent execution of `sql` with bound parameters.
    #[must_use]
    pub fn query<'conn>(&'conn self, sql: &str) -> QueryBuilder<'conn> {
        QueryBuilder::new(self, sql)
    }

    /// Compile `query` with the connection's grammar and run it.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` with the native diagnostic.
    pub fn select_query(&self, query: &SelectQuery) -> Result<ResultSet, CacheDbError> {
        let sql = query.to_sql(self.grammar());
        let params = query
            .bindings()
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (ParamKey::Position(idx + 1), value));
        let mut stmt = self.prepare(&sql);
        stmt.execute_with(params)?;
        collect_result_set(&mut stmt)
    }

    /// Run `sql` and return the newest `sequence` value of `table`.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` from either statement.
    pub fn insert_get_id(
        &self,
        sql: &str,
        params: &[(ParamKey, RowValues)],
        table: &str,
        sequence: Option<&str>,
    ) -> Result<RowValues, CacheDbError> {
        self.strategies
            .processor
            .insert_get_id(self, sql, params, table, sequence)
    }

    #[must_use]
    pub fn get_attribute(&self, attr: Attribute) -> AttributeValue {
        self.options.get(attr)
    }

    /// Look up an attribute by config name; unknown names yield `None`.
    #[must_use]
    pub fn get_attribute_by_name(&self, name: &str) -> Option<AttributeValue> {
        self.options.get_by_name(name)
    }

    /// # Errors
    /// `ConfigError` when the value does not fit the attribute.
    pub fn set_attribute(
        &mut self,
        attr: Attribute,
        value: AttributeValue,
    ) -> Result<(), CacheDbError> {
        self.options.set(attr, value)
    }

    /// Returned unchanged. Untrusted input must go through parameter binding.
    #[must_use]
    pub fn quote<'a>(&self, value: &'a str) -> &'a str {
        value
    }

    /// Switch to manual commit.
    ///
    /// # Errors
    /// `TransactionError` if autocommit cannot be disabled or the
    /// `START TRANSACTION` marker fails; autocommit is back on in the latter case.
    pub fn begin(&mut self) -> Result<bool, CacheDbError> {
        let markers = self.options.explicit_transaction_markers;
        self.tx.begin(&*self.session, markers)
    }

    /// Commit the transaction, or roll it back when the session carries an
    /// error from earlier work. Returns the native result.
    ///
    /// # Errors
    /// `TransactionError` only from the rollback path.
    pub fn commit(&mut self) -> Result<bool, CacheDbError> {
        let markers = self.options.explicit_transaction_markers;
        self.tx.commit(&*self.session, markers)
    }

    /// Roll back and return to autocommit. `Ok(false)` when the native
    /// rollback fails without a diagnostic.
    ///
    /// # Errors
    /// `TransactionError` when the native rollback fails with a diagnostic,
    /// or when the `ROLLBACK` marker failed. The native rollback runs either way.
    pub fn rollback(&mut self) -> Result<bool, CacheDbError> {
        let markers = self.options.explicit_transaction_markers;
        self.tx.rollback(&*self.session, markers)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.in_transaction()
    }

    #[must_use]
    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("options", &self.options)
            .field("tx_state", &self.tx.state())
            .field("strategies", &self.strategies)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Drain an executed statement into an associative result set.
pub(crate) fn collect_result_set(
    stmt: &mut PreparedStatement<'_>,
) -> Result<ResultSet, CacheDbError> {
    let mut result_set = ResultSet::default();
    while let Some(row) = stmt.fetch_with(FetchMode::Assoc)? {
        if let FetchedRow::Assoc(row) = row {
            result_set.add_row(row);
        }
    }
    Ok(result_set)
}

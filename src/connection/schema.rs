use super::Connection;
use crate::error::CacheDbError;
use crate::grammar::{Blueprint, Command};
use crate::statement::FetchMode;
use crate::types::RowValues;

impl Connection {
    /// Whether `table` exists, within the connection's schema when one is set.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` from the existence probe.
    pub fn has_table(&self, table: &str) -> Result<bool, CacheDbError> {
        let sql = self.schema_grammar().compile_table_exists(self.schema());
        let mut stmt = self.prepare(&sql);
        stmt.bind_value(1_usize, table);
        stmt.execute()?;
        Ok(stmt.fetch()?.is_some())
    }

    /// Drop `table` if it exists. Returns whether a drop was issued.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` from the probe or the drop.
    pub fn drop_if_exists(&self, table: &str) -> Result<bool, CacheDbError> {
        if !self.has_table(table)? {
            tracing::debug!(table, "drop skipped, table absent");
            return Ok(false);
        }
        let mut blueprint = Blueprint::new(table);
        blueprint.drop();
        self.run_blueprint(&blueprint)?;
        Ok(true)
    }

    /// Execute every statement of `blueprint` in order.
    ///
    /// A queued `drop if exists` is skipped when the table is absent.
    ///
    /// # Errors
    /// The first `PrepareError` or `ExecuteError`; later statements are not run.
    pub fn run_blueprint(&self, blueprint: &Blueprint) -> Result<(), CacheDbError> {
        let mut blueprint = blueprint.clone();
        if blueprint.commands().contains(&Command::DropIfExists)
            && !self.has_table(blueprint.table())?
        {
            blueprint.retain_commands(|command| *command != Command::DropIfExists);
        }
        for sql in blueprint.to_sql(self.schema_grammar()) {
            self.exec(&sql)?;
        }
        Ok(())
    }

    /// Table names of `schema`, as the server reports them.
    ///
    /// # Errors
    /// `PrepareError` or `ExecuteError` from the listing query.
    pub fn list_tables(&self, schema: &str) -> Result<Vec<String>, CacheDbError> {
        let sql = self.schema_grammar().compile_list_tables();
        let mut stmt = self.prepare(&sql);
        stmt.bind_value(1_usize, schema);
        stmt.execute()?;

        let mut tables = Vec::new();
        while let Some(row) = stmt.fetch_with(FetchMode::Assoc)? {
            let name = row.as_assoc().and_then(|row| {
                row.iter()
                    .find(|(column, _)| column.eq_ignore_ascii_case("table_name"))
                    .and_then(|(_, value)| match value {
                        RowValues::Text(name) => Some(name.clone()),
                        _ => None,
                    })
            });
            if let Some(name) = name {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// Drop every table of `schema` inside one transaction. Returns the
    /// number of tables dropped.
    ///
    /// # Errors
    /// The listing error, or the first drop error after the transaction was
    /// rolled back.
    pub fn drop_all_tables(&mut self, schema: &str) -> Result<usize, CacheDbError> {
        let tables = self.list_tables(schema)?;
        tracing::debug!(schema, count = tables.len(), "dropping all tables");

        self.begin()?;
        for table in &tables {
            let mut blueprint = Blueprint::new(table.as_str());
            blueprint.drop();
            if let Err(err) = self.run_blueprint(&blueprint) {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(%rollback_err, table = %table, "rollback after failed drop also failed");
                }
                return Err(err);
            }
        }
        self.commit()?;
        Ok(tables.len())
    }
}

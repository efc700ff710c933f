//! Helper utilities for testing and development.

use std::sync::Arc;

use crate::connection::Connection;
use crate::error::CacheDbError;
use crate::native::Credentials;
use crate::options::CacheOptions;
use crate::results::Row;
use crate::types::RowValues;

use super::ScriptedDriver;

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> Row {
    Row::new(Arc::new(column_names), values)
}

/// Open a connection on a scripted driver with the given options.
///
/// # Errors
/// Returns `CacheDbError::ConnectionError` when the script makes connect fail.
pub fn scripted_connection(
    driver: &ScriptedDriver,
    options: CacheOptions,
) -> Result<Connection, CacheDbError> {
    Connection::connect(driver, "scripted", &Credentials::default(), options)
}

// src/db/helpers.rs

use crate::db::Database;
use crate::error::AppError;
use rusqlite::Connection;
use std::path::Path;

/// Open a connection, run one database operation on it, and close it.
///
/// Every caller gets its own connection, so the sampler thread and the CLI
/// thread never share one.
///
/// # Example
/// ```ignore
/// with_connection(&path, "load focus settings", |conn| {
///     FocusSettings::find_latest(conn)
/// })
/// ```
pub fn with_connection<F, T>(path: &Path, operation: &str, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let db = Database::open(path).map_err(|e| {
        log::debug!("Failed to open database for {operation}: {e}");
        AppError::from(e)
    })?;

    f(db.connection()).map_err(|e| {
        log::debug!("Failed to {operation}: {e}");
        AppError::from(e)
    })
}

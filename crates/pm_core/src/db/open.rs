//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.
//! - Returned connections expose `pm_fold(text)`, the Unicode lowercase fold
//!   used by free-text search.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::CoreConfig;
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL name of the search fold function registered on every connection.
pub const FOLD_FUNCTION: &str = "pm_fold";

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Opens the database selected by `config.database_path`.
pub fn open_from_config(config: &CoreConfig) -> DbResult<Connection> {
    match &config.database_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
}

fn open_with<F>(mode: &'static str, connect: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    register_fold(conn)?;
    apply_migrations(conn)?;
    Ok(())
}

/// Registers `pm_fold`, a full Unicode lowercase fold.
///
/// SQLite's built-in `LOWER()` only folds ASCII, while search patterns are
/// folded with Rust's `to_lowercase`; both sides must use the same rules.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let folded = match ctx.get_raw(0) {
                ValueRef::Null => None,
                ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).to_lowercase()),
                ValueRef::Integer(value) => Some(value.to_string()),
                ValueRef::Real(value) => Some(value.to_string()),
                ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).to_lowercase()),
            };
            Ok(folded)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::open_db_in_memory;

    #[test]
    fn fold_lowercases_non_ascii_text() {
        let conn = open_db_in_memory().unwrap();
        let folded: String = conn
            .query_row("SELECT pm_fold('ÉCOLE Ünïversité')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "école ünïversité");
    }

    #[test]
    fn fold_passes_null_through() {
        let conn = open_db_in_memory().unwrap();
        let folded: Option<String> = conn
            .query_row("SELECT pm_fold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, None);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for submitted addresses.
//!
//! A single database file (default `data/address_map.duckdb`, override with
//! `ADDRESS_MAP_DB`) holds a `queries` table with one row per submitted
//! address and a `parsed_addresses` table with the parsed components keyed
//! by query ID.
//!
//! [`Connection`] is `Send` but not `Sync`; callers that share one across
//! threads wrap it in a [`Mutex`] and go through [`lock`].

pub mod paths;
pub mod queries;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub use duckdb::Connection;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// An I/O operation failed (e.g., creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A thread panicked while holding the connection lock.
    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Opens (or creates) the database at `path` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the directory, connection, or schema creation
/// fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    queries::create_schema(&conn)?;
    log::debug!("Opened address database at {}", path.display());
    Ok(conn)
}

/// Opens the database at the default path (see [`paths::db_path`]).
///
/// # Errors
///
/// Returns [`DbError`] if the directory, connection, or schema creation
/// fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&paths::db_path())
}

/// Opens a throwaway in-memory database with the schema applied.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    queries::create_schema(&conn)?;
    Ok(conn)
}

/// Locks a shared connection.
///
/// # Errors
///
/// Returns [`DbError::Poisoned`] if a previous holder panicked.
pub fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, DbError> {
    db.lock().map_err(|_| DbError::Poisoned)
}

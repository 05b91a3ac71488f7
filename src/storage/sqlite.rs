//! SQLite connection handle

use std::path::{Path, PathBuf};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use crate::{ConnectionError, Result};
use super::schema::quote_ident;

/// Where a store lives, parsed from a location string.
///
/// Accepted forms:
/// - `jdbc:sqlite:<path>`
/// - `sqlite:<path>` or `sqlite://<path>`
/// - `:memory:` (also behind either prefix)
/// - a plain filesystem path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    pub fn parse(location: &str) -> std::result::Result<Self, ConnectionError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(ConnectionError::InvalidLocation("location is empty".to_string()));
        }

        let stripped = trimmed
            .strip_prefix("jdbc:sqlite:")
            .or_else(|| trimmed.strip_prefix("sqlite://"))
            .or_else(|| trimmed.strip_prefix("sqlite:"));

        let path = match stripped {
            Some(rest) => rest.trim(),
            None if trimmed.contains("://") => {
                return Err(ConnectionError::InvalidLocation(format!(
                    "unsupported scheme in {}",
                    trimmed
                )));
            }
            None => trimmed,
        };

        if path.is_empty() {
            return Err(ConnectionError::InvalidLocation(format!(
                "no database path in {}",
                trimmed
            )));
        }

        if path == ":memory:" {
            Ok(StoreLocation::Memory)
        } else {
            Ok(StoreLocation::File(PathBuf::from(path)))
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreLocation::Memory => None,
            StoreLocation::File(path) => Some(path),
        }
    }
}

/// An open session to a SQLite store.
///
/// The session is released by `close()`, or on drop if the owner never
/// closed it. After `close()` every operation fails with
/// `ConnectionError::Closed`, including a second `close()`.
pub struct StoreConnection {
    location: String,
    conn: Option<Connection>,
}

impl StoreConnection {
    /// Open the store at `location`, creating the database file if missing.
    ///
    /// The session is verified with a schema read, so a missing directory or a
    /// file that is not a database fails here rather than during an import.
    pub fn connect(location: &str) -> std::result::Result<Self, ConnectionError> {
        Self::open(
            location,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Open an existing store read-only. A missing database file is
    /// `Unreachable` instead of being created.
    pub fn open_existing(location: &str) -> std::result::Result<Self, ConnectionError> {
        Self::open(
            location,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn open(location: &str, flags: OpenFlags) -> std::result::Result<Self, ConnectionError> {
        let target = StoreLocation::parse(location)?;

        let opened = match &target {
            StoreLocation::Memory => Connection::open_in_memory(),
            StoreLocation::File(path) => Connection::open_with_flags(path, flags),
        };

        let conn = opened.map_err(|source| ConnectionError::Unreachable {
            location: location.to_string(),
            source,
        })?;

        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|source| ConnectionError::Unreachable {
                location: location.to_string(),
                source,
            })?;

        tracing::info!("Connected to store {}", location);
        Ok(Self {
            location: location.to_string(),
            conn: Some(conn),
        })
    }

    /// Release the session.
    ///
    /// If SQLite refuses to close (e.g. a statement is still alive) the
    /// handle stays open and the call can be retried.
    pub fn close(&mut self) -> std::result::Result<(), ConnectionError> {
        let conn = self.conn.take().ok_or(ConnectionError::Closed)?;
        match conn.close() {
            Ok(()) => {
                tracing::info!("Closed store {}", self.location);
                Ok(())
            }
            Err((conn, e)) => {
                self.conn = Some(conn);
                Err(ConnectionError::Close(e))
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// The location string this handle was opened from
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn connection(&self) -> std::result::Result<&Connection, ConnectionError> {
        self.conn.as_ref().ok_or(ConnectionError::Closed)
    }

    pub fn connection_mut(&mut self) -> std::result::Result<&mut Connection, ConnectionError> {
        self.conn.as_mut().ok_or(ConnectionError::Closed)
    }

    /// Check whether a table exists (case-insensitive, as SQLite resolves names)
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .connection()?
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Count rows in a table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.connection()?.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get statistics for one table; a missing table reports zero rows
    pub fn table_stats(&self, table: &str) -> Result<TableStats> {
        let exists = self.table_exists(table)?;
        let rows = if exists { self.count_rows(table)? } else { 0 };
        Ok(TableStats {
            table: table.to_string(),
            exists,
            rows,
        })
    }
}

impl Drop for StoreConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => tracing::debug!("Closed store {} on drop", self.location),
                Err((_, e)) => tracing::warn!("Failed to close store {} on drop: {}", self.location, e),
            }
        }
    }
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnection")
            .field("location", &self.location)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Open a store, run `f` against it, and close it on every exit path.
///
/// When `f` fails its error is returned and a close failure is only logged.
pub fn with_connection<T, E, F>(location: &str, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&mut StoreConnection) -> std::result::Result<T, E>,
    E: From<ConnectionError>,
{
    let mut store = StoreConnection::connect(location)?;
    let outcome = f(&mut store);
    let closed = if store.is_closed() { Ok(()) } else { store.close() };

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!("Failed to close store {}: {}", location, close_err);
            Err(e)
        }
    }
}

/// Row statistics for one table
#[derive(Debug, Clone)]
pub struct TableStats {
    pub table: String,
    pub exists: bool,
    pub rows: usize,
}

impl std::fmt::Display for TableStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Table Statistics:")?;
        writeln!(f, "  Table: {}", self.table)?;
        writeln!(f, "  Exists: {}", self.exists)?;
        writeln!(f, "  Rows: {}", self.rows)
    }
}

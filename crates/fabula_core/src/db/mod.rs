//! SQLite storage bootstrap and schema checks.
//!
//! # Responsibility
//! - Open and configure SQLite connections backing a story project.
//! - Apply schema migrations in deterministic order.
//! - Verify a caller-supplied connection before repositories use it.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No project data is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

use migrations::latest_version;
use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Database was written by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection was not migrated to this build's schema.
    SchemaMismatch { expected: u32, actual: u32 },
    MissingTable(&'static str),
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch { expected, actual } => write!(
                f,
                "database schema version {actual} does not match expected {expected}"
            ),
            Self::MissingTable(table) => write!(f, "database is missing table `{table}`"),
            Self::MissingColumn { table, column } => {
                write!(f, "database table `{table}` is missing column `{column}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `conn` is migrated and carries the given tables and columns.
pub fn ensure_schema(
    conn: &Connection,
    required: &[(&'static str, &[&'static str])],
) -> DbResult<()> {
    let expected = latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected {
        return Err(DbError::SchemaMismatch { expected, actual });
    }

    for &(table, columns) in required {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(DbError::MissingTable(table));
        }
        if let Some(column) = columns
            .iter()
            .copied()
            .find(|column| !present.iter().any(|name| name == column))
        {
            return Err(DbError::MissingColumn { table, column });
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

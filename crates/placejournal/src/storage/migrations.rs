//! Database migration system for placejournal.
//!
//! Versions the `SQLite` container only. Blobs inside `kv_store` carry no
//! version of their own; a blob written before versioning existed is
//! version 0 of its format.
//!
//! Each pending migration runs in its own transaction together with the
//! version bump, so a failed step leaves the database at the last version
//! that fully applied.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_KV_TABLE, CREATE_METADATA_TABLE};

/// A single schema step.
#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

/// Every schema step, in order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "key-value blob table",
    statements: &[CREATE_KV_TABLE],
}];

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if a migration fails or the database was written by a
/// newer version of placejournal.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration)?;
    }

    Ok(())
}

/// Read the schema version, 0 when none was recorded.
fn schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = match conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    ) {
        Ok(value) => Some(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };

    stored.map_or(Ok(0), |value| {
        value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        })
    })
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for statement in migration.statements {
        tx.execute(statement, [])?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        version = migration.version,
        description = migration.description,
        "Applied schema migration"
    );
    Ok(())
}

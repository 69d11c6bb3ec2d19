//! Storage layer for placejournal.
//!
//! This module provides the device-local key-value storage the journal is
//! persisted in. Every key holds one serialized blob that is always written
//! and read as a whole; a write replaces the previous value in a single
//! statement, so readers see either the old blob or the new one.
//!
//! Several handles may open the same database file. A read-modify-write
//! goes through [`BlobStore::update`], which `Storage` runs inside one
//! `BEGIN IMMEDIATE` transaction so that writers on other connections wait
//! instead of interleaving.

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Whole-value key-value storage.
pub trait BlobStore: Send + std::fmt::Debug {
    /// Read the blob stored under `key`, or `None` if nothing was written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written. On error the
    /// previous value is left in place.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Replace the blob under `key` with a value computed from the current one.
    ///
    /// `apply` receives the result of reading the current blob and returns
    /// the replacement. No other writer can change the blob between the read
    /// and the write. If `apply` fails nothing is written and its error is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error from `apply`, or an error if the backing store
    /// cannot be written.
    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Result<Option<String>>) -> Result<String>,
    ) -> Result<()> {
        let current = self.get(key);
        let next = apply(current)?;
        self.set(key, &next)
    }

    /// Where this store keeps its data.
    fn path(&self) -> &Path;
}

/// `SQLite`-backed blob storage.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open the journal database, creating it and its directory on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created, or
    /// the schema is newer than this build understands.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!(path = %path.display(), "Opening journal database");
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!(path = %path.display(), "Journal database ready");
        Ok(Self { path, conn })
    }

    /// Open a private database that disappears with the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Number of keys holding a blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn select(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn upsert(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        ",
        params![key, value],
    )?;
    Ok(())
}

impl BlobStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        select(&self.conn, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        upsert(&self.conn, key, value)?;
        debug!(key, bytes = value.len(), "Stored blob");
        Ok(())
    }

    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Result<Option<String>>) -> Result<String>,
    ) -> Result<()> {
        // Takes the write lock up front; dropping `tx` on error rolls back
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let next = apply(select(&tx, key))?;
        upsert(&tx, key, &next)?;
        tx.commit()?;

        debug!(key, bytes = next.len(), "Updated blob");
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Blob storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one blob.
    #[must_use]
    pub fn with_blob(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.into(), value.into());
        Self { blobs }
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn path(&self) -> &Path {
        Path::new(":memory:")
    }
}

//! The place journal store.
//!
//! The journal is an ordered, append-only sequence of [`Place`] records,
//! newest first, persisted as one JSON array under a single blob key.
//!
//! # Invariants
//! - Every mutation rewrites the whole sequence in one blob write.
//! - `append` runs its read-modify-write as one [`BlobStore::update`], under
//!   the handle lock and, for `SQLite`, inside one write transaction. Appends
//!   from other handles on the same file wait rather than interleave.
//! - Only places that serialize to valid JSON are written.
//! - Ids are unique within the journal.
//! - An unreadable blob is never overwritten by `append`.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::place::Place;
use crate::storage::{BlobStore, MemoryStore, Storage};

/// Default key the journal is stored under.
pub const DEFAULT_BLOB_KEY: &str = "places";

/// What readers do when the persisted journal cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreadablePolicy {
    /// Report the journal as unreadable.
    #[default]
    Surface,
    /// Log a warning and show an empty journal.
    Empty,
}

/// The persisted, append-only place journal.
#[derive(Debug)]
pub struct PlaceJournal {
    blobs: Mutex<Box<dyn BlobStore>>,
    key: String,
}

impl PlaceJournal {
    /// Create a journal over the given blob store.
    #[must_use]
    pub fn new(blobs: impl BlobStore + 'static, key: impl Into<String>) -> Self {
        Self {
            blobs: Mutex::new(Box::new(blobs)),
            key: key.into(),
        }
    }

    /// Open the journal described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Ok(Self::new(storage, config.storage.blob_key.clone()))
    }

    /// Create an empty journal that is not persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), DEFAULT_BLOB_KEY)
    }

    /// The blob key this journal is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read every place, newest first.
    ///
    /// A journal that was never written is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageRead`] if the stored blob cannot be read or
    /// deserialized.
    pub fn list(&self) -> Result<Vec<Place>> {
        let blobs = self.lock()?;
        self.read(blobs.as_ref())
    }

    /// Look up a place by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageRead`] if the stored blob cannot be read.
    pub fn get(&self, id: &str) -> Result<Option<Place>> {
        Ok(self.list()?.into_iter().find(|place| place.id == id))
    }

    /// Count the places in the journal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageRead`] if the stored blob cannot be read.
    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    /// Check if the journal has no places.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageRead`] if the stored blob cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Prepend a place and persist the whole journal.
    ///
    /// The candidate is checked with [`Place::validate`] before the journal
    /// is touched.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPhoto`] or [`Error::InvalidCoordinates`] if the
    ///   candidate has no photo or coordinates JSON cannot represent.
    /// - [`Error::StorageRead`] if the current journal cannot be read; the
    ///   stored blob is left untouched.
    /// - [`Error::DuplicateId`] if a place with the same id exists.
    /// - [`Error::StorageWrite`] if the new journal cannot be written; the
    ///   stored journal is unchanged.
    pub fn append(&self, candidate: Place) -> Result<()> {
        candidate.validate()?;

        let mut blobs = self.lock()?;
        let mut rejected = None;
        let mut total = 0;

        let written = blobs.update(&self.key, &mut |current| {
            let next = current
                .map_err(|e| Error::storage_read(&self.key, e.to_string()))
                .and_then(|raw| self.parse(raw))
                .and_then(|places| self.prepend(places, &candidate));
            match next {
                Ok((serialized, len)) => {
                    total = len;
                    Ok(serialized)
                }
                Err(e) => {
                    let message = e.to_string();
                    rejected = Some(e);
                    Err(Error::internal(message))
                }
            }
        });

        match (written, rejected) {
            (Ok(()), _) => {
                info!(id = %candidate.id, total, "Place saved");
                Ok(())
            }
            (Err(_), Some(e)) => Err(e),
            (Err(e), None) => Err(Error::storage_write(&self.key, e.to_string())),
        }
    }

    /// Serialize `places` with `candidate` in front.
    fn prepend(&self, mut places: Vec<Place>, candidate: &Place) -> Result<(String, usize)> {
        if places.iter().any(|place| place.id == candidate.id) {
            return Err(Error::DuplicateId {
                id: candidate.id.clone(),
            });
        }
        places.insert(0, candidate.clone());

        let serialized = serde_json::to_string(&places)
            .map_err(|e| Error::storage_write(&self.key, e.to_string()))?;
        Ok((serialized, places.len()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn BlobStore>>> {
        self.blobs
            .lock()
            .map_err(|_| Error::internal("journal lock poisoned"))
    }

    fn read(&self, blobs: &dyn BlobStore) -> Result<Vec<Place>> {
        let raw = blobs
            .get(&self.key)
            .map_err(|e| Error::storage_read(&self.key, e.to_string()))?;
        self.parse(raw)
    }

    fn parse(&self, raw: Option<String>) -> Result<Vec<Place>> {
        let Some(raw) = raw else {
            debug!(key = %self.key, "No journal stored yet");
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).map_err(|e| {
            warn!(key = %self.key, error = %e, "Stored journal could not be parsed");
            Error::storage_read(&self.key, e.to_string())
        })
    }
}

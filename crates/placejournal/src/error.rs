//! Error types for placejournal.
//!
//! This module defines all error types used throughout the placejournal crate,
//! along with the classification used at the outer boundary to decide which
//! failures become a user-facing notice and which abort an operation.

use std::path::PathBuf;
use thiserror::Error;

use crate::capture::CaptureState;
use crate::device::Capability;
use crate::place::Coordinates;

/// The main error type for placejournal operations.
#[derive(Error, Debug)]
pub enum Error {
    // --- journal storage ---
    /// The key-value database could not be opened.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Database file.
        path: PathBuf,
        /// Cause reported by `SQLite`.
        #[source]
        source: rusqlite::Error,
    },

    /// A key-value query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The database schema could not be brought up to date.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Why the migration stopped.
        message: String,
    },

    /// The persisted journal exists but could not be read back.
    #[error("journal '{key}' is unreadable: {message}")]
    StorageRead {
        /// Key of the blob that failed to load.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The journal could not be written; nothing was persisted.
    #[error("failed to save journal '{key}': {message}")]
    StorageWrite {
        /// Key of the blob that failed to save.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A place with this id is already in the journal.
    #[error("place id {id} already exists in the journal")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// No place with this id exists.
    #[error("no place with id {id}")]
    PlaceNotFound {
        /// The id that was looked up.
        id: String,
    },

    // --- configuration ---
    /// The layered configuration could not be extracted.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// A configuration value is out of range.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// The offending setting.
        message: String,
    },

    // --- capture and capabilities ---
    /// The user refused a device permission.
    #[error("{capability} permission denied")]
    PermissionDenied {
        /// The capability that was refused.
        capability: Capability,
    },

    /// The user dismissed the camera without taking a photo.
    #[error("photo capture cancelled")]
    CaptureCancelled,

    /// The camera failed to produce a photo.
    #[error("failed to take photo: {message}")]
    CaptureFailed {
        /// Description of what went wrong.
        message: String,
    },

    /// No position could be sampled. Capture continues without coordinates.
    #[error("location unavailable: {reason}")]
    LocationUnavailable {
        /// Why the position is missing.
        reason: String,
    },

    /// Coordinates that are not finite or lie outside WGS84 bounds.
    #[error("coordinates out of range: {position}")]
    InvalidCoordinates {
        /// The rejected position.
        position: Coordinates,
    },

    /// A place cannot be saved before a photo has been taken.
    #[error("a photo is required before saving a place")]
    MissingPhoto,

    /// An operation was attempted from a capture state that does not allow it.
    #[error("cannot {operation} while capture is {state}")]
    InvalidTransition {
        /// Current state of the session.
        state: CaptureState,
        /// The attempted operation.
        operation: &'static str,
    },

    /// A photo reference could not be resolved to a local file URI.
    #[error("invalid photo reference '{reference}': {message}")]
    InvalidPhoto {
        /// The reference as supplied.
        reference: String,
        /// Description of what went wrong.
        message: String,
    },

    // --- filesystem ---
    /// A filesystem call failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Directory being created.
        path: PathBuf,
        /// Cause reported by the OS.
        #[source]
        source: std::io::Error,
    },

    /// A place or journal could not be converted to or from JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A device capability call failed outright.
    #[error("device error: {0}")]
    Device(String),

    /// A broken internal invariant, such as a poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for placejournal operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new device error.
    #[must_use]
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a storage read error for the given blob key.
    #[must_use]
    pub fn storage_read(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageRead {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a storage write error for the given blob key.
    #[must_use]
    pub fn storage_write(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageWrite {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a location unavailable error.
    #[must_use]
    pub fn location_unavailable(reason: impl Into<String>) -> Self {
        Self::LocationUnavailable {
            reason: reason.into(),
        }
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if this error lets the surrounding flow continue.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::LocationUnavailable { .. })
    }

    /// Check if this error means the persisted journal could not be read.
    #[must_use]
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::StorageRead { .. })
    }

    /// Short notice to show the user for outcomes that are recovered at the
    /// boundary instead of being propagated.
    #[must_use]
    pub fn user_notice(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied {
                capability: Capability::Camera,
            } => Some("Permission required: we need access to your camera"),
            Self::PermissionDenied {
                capability: Capability::Location,
            } => Some("Permission required: we need access to your location"),
            Self::PermissionDenied {
                capability: Capability::Biometrics,
            } => Some("Authentication required"),
            Self::CaptureCancelled => Some("No photo taken"),
            Self::CaptureFailed { .. } => Some("Could not take the photo"),
            Self::LocationUnavailable { .. } => {
                Some("Location disabled: the place will not be marked on the map")
            }
            Self::MissingPhoto => Some("Take a photo first"),
            Self::StorageWrite { .. } => Some("Could not save the place"),
            _ => None,
        }
    }
}

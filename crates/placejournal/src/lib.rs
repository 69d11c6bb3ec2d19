//! `placejournal` - A photo journal of places
//!
//! This library provides the core functionality for capturing photos of places,
//! tagging them with the device position, and keeping them in a local journal
//! that can be browsed as a list or on a map.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod browse;
pub mod capture;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod journal;
pub mod logging;
pub mod map;
pub mod place;
pub mod storage;

pub use browse::{BrowseFlow, ListRow};
pub use capture::{CaptureSession, CaptureState};
pub use config::Config;
pub use error::{Error, Result};
pub use gate::{CapabilityGate, GateOutcome};
pub use journal::{PlaceJournal, UnreadablePolicy};
pub use logging::init_logging;
pub use map::{render, MapRequest, MapView};
pub use place::{Coordinates, Place};
pub use storage::{BlobStore, MemoryStore, Storage};

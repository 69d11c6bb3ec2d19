//! Core journal entry types for placejournal.
//!
//! A [`Place`] is one journal entry: a photo, optional coordinates, a title
//! and the moment it was created. The serialized form is the persisted blob
//! layout, so field names here are part of the on-disk format.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Title used when the user leaves the title blank.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Last id handed out by this process, in milliseconds since the epoch.
static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a new coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// A single journal entry.
///
/// Two places are equal when their ids are; the other fields are payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    /// Unique id derived from the creation timestamp. Sole equality key.
    pub id: String,

    /// Title as the user typed it, or the default placeholder.
    pub title: String,

    /// Local file URI of the captured photo. Never empty for a saved place.
    pub photo: String,

    /// Where the photo was taken, if a position could be sampled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,

    /// When the place was created.
    #[serde(with = "iso8601")]
    pub date: DateTime<Utc>,
}

impl Place {
    /// Create a new place stamped with the current time and a fresh id.
    ///
    /// A blank `title` is replaced by `default_title`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPhoto`] if `photo` is empty.
    /// - [`Error::InvalidCoordinates`] if `location` is not a finite position
    ///   within range.
    pub fn new(
        title: &str,
        default_title: &str,
        photo: impl Into<String>,
        location: Option<Coordinates>,
    ) -> Result<Self> {
        Self::new_at(Utc::now(), title, default_title, photo, location)
    }

    /// Create a new place stamped with the given creation time.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPhoto`] if `photo` is empty.
    /// - [`Error::InvalidCoordinates`] if `location` is not a finite position
    ///   within range.
    pub fn new_at(
        now: DateTime<Utc>,
        title: &str,
        default_title: &str,
        photo: impl Into<String>,
        location: Option<Coordinates>,
    ) -> Result<Self> {
        let photo = photo.into();
        if photo.trim().is_empty() {
            return Err(Error::MissingPhoto);
        }

        if let Some(position) = location.filter(|p| !p.is_valid()) {
            return Err(Error::InvalidCoordinates { position });
        }

        let title = if title.trim().is_empty() {
            default_title.to_string()
        } else {
            title.to_string()
        };

        let date = now.trunc_subsecs(3);
        Ok(Self {
            id: next_id(date.timestamp_millis()),
            title,
            photo,
            location,
            date,
        })
    }

    /// Check that the place can be persisted and read back.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPhoto`] if the photo is empty.
    /// - [`Error::InvalidCoordinates`] if the location is out of range or
    ///   not finite, which JSON cannot represent.
    pub fn validate(&self) -> Result<()> {
        if self.photo.trim().is_empty() {
            return Err(Error::MissingPhoto);
        }
        match self.location {
            Some(position) if !position.is_valid() => {
                Err(Error::InvalidCoordinates { position })
            }
            _ => Ok(()),
        }
    }

    /// Check if this place can be shown as a map pin.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Place {}

impl std::hash::Hash for Place {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Issue an id for a place created at `now_ms`.
///
/// Ids are the creation time in milliseconds, bumped past the last issued
/// id so two places created within the same millisecond never collide.
fn next_id(now_ms: i64) -> String {
    let mut last = LAST_ID.load(Ordering::SeqCst);
    loop {
        let candidate = now_ms.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

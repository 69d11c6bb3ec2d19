//! Browsing the journal.
//!
//! The browse view pulls a fresh copy of the journal each time it regains
//! focus. Nothing is pushed to it; callers decide when to [`BrowseFlow::refresh`].

use chrono::Local;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::journal::{PlaceJournal, UnreadablePolicy};
use crate::map::MapRequest;
use crate::place::Place;

/// Date format for list rows.
const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// One row of the place list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    /// Id of the place.
    pub id: String,
    /// Title of the place.
    pub title: String,
    /// Creation date on the local calendar.
    pub date_label: String,
    /// Whether the place has a location.
    pub located: bool,
}

impl From<&Place> for ListRow {
    fn from(place: &Place) -> Self {
        Self {
            id: place.id.clone(),
            title: place.title.clone(),
            date_label: place
                .date
                .with_timezone(&Local)
                .format(DATE_LABEL_FORMAT)
                .to_string(),
            located: place.has_location(),
        }
    }
}

/// The browse view's snapshot of the journal.
#[derive(Debug)]
pub struct BrowseFlow<'a> {
    journal: &'a PlaceJournal,
    policy: UnreadablePolicy,
    places: Vec<Place>,
}

impl<'a> BrowseFlow<'a> {
    /// Create a browse flow with an empty snapshot.
    #[must_use]
    pub fn new(journal: &'a PlaceJournal, policy: UnreadablePolicy) -> Self {
        Self {
            journal,
            policy,
            places: Vec::new(),
        }
    }

    /// Re-read the whole journal.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorageRead`] if the journal cannot be read
    /// and the policy is [`UnreadablePolicy::Surface`]. The previous
    /// snapshot is kept in that case.
    pub fn refresh(&mut self) -> Result<&[Place]> {
        match self.journal.list() {
            Ok(places) => {
                debug!(count = places.len(), "Journal refreshed");
                self.places = places;
            }
            Err(e) if e.is_unreadable() && self.policy == UnreadablePolicy::Empty => {
                warn!(error = %e, "Journal unreadable, showing it as empty");
                self.places.clear();
            }
            Err(e) => return Err(e),
        }
        Ok(&self.places)
    }

    /// The current snapshot.
    #[must_use]
    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// The current snapshot as list rows.
    #[must_use]
    pub fn rows(&self) -> Vec<ListRow> {
        self.places.iter().map(ListRow::from).collect()
    }

    /// Hand one place to the map.
    #[must_use]
    pub fn select_for_map(&self, place: &Place) -> MapRequest {
        MapRequest::single(place.clone())
    }

    /// Hand the whole snapshot to the map.
    #[must_use]
    pub fn map_all(&self) -> MapRequest {
        MapRequest::all(self.places.clone())
    }
}

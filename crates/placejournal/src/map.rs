//! Map rendering.
//!
//! Turns a list of places into an initial map region and a set of pins.
//! Rendering is pure: it never touches the journal.

use std::collections::HashSet;

use serde::Serialize;

use crate::place::{Coordinates, Place};

/// Latitude span of the initial region, in degrees.
pub const LATITUDE_DELTA: f64 = 0.0922;

/// Longitude span of the initial region, in degrees.
pub const LONGITUDE_DELTA: f64 = 0.0421;

/// The visible area of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    /// Latitude of the centre.
    pub latitude: f64,
    /// Longitude of the centre.
    pub longitude: f64,
    /// Latitude span.
    pub latitude_delta: f64,
    /// Longitude span.
    pub longitude_delta: f64,
}

impl Region {
    /// A region of the default span centred on `center`.
    #[must_use]
    pub fn centered_on(center: Coordinates) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            latitude_delta: LATITUDE_DELTA,
            longitude_delta: LONGITUDE_DELTA,
        }
    }
}

/// A marker for one located place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    /// Id of the place the pin stands for.
    pub id: String,
    /// Label shown on the pin.
    pub title: String,
    /// Where the pin sits.
    pub coordinates: Coordinates,
}

/// What the map screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapView {
    /// Nothing to show.
    Empty,
    /// A map with its initial region and pins.
    Map {
        /// Initial region.
        region: Region,
        /// One pin per located place.
        pins: Vec<Pin>,
    },
}

impl MapView {
    /// The pins on the map, empty for [`MapView::Empty`].
    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        match self {
            Self::Empty => &[],
            Self::Map { pins, .. } => pins,
        }
    }
}

/// Places handed to the map screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    /// The places to show, in display order.
    pub places: Vec<Place>,
}

impl MapRequest {
    /// A request for a single place.
    #[must_use]
    pub fn single(place: Place) -> Self {
        Self {
            places: vec![place],
        }
    }

    /// A request for every given place.
    #[must_use]
    pub fn all(places: Vec<Place>) -> Self {
        Self { places }
    }

    /// Render the request.
    #[must_use]
    pub fn render(&self) -> MapView {
        render(&self.places)
    }
}

/// Render places onto a map.
///
/// The region is centred on the first place, or on `0, 0` when that place
/// has no location. Places without a location get no pin and a place
/// repeated in the input gets one.
#[must_use]
pub fn render(places: &[Place]) -> MapView {
    let Some(first) = places.first() else {
        return MapView::Empty;
    };

    let center = first.location.unwrap_or(Coordinates::new(0.0, 0.0));

    let mut seen = HashSet::new();
    let pins = places
        .iter()
        .filter_map(|place| {
            let coordinates = place.location?;
            seen.insert(place.id.as_str()).then(|| Pin {
                id: place.id.clone(),
                title: place.title.clone(),
                coordinates,
            })
        })
        .collect();

    MapView::Map {
        region: Region::centered_on(center),
        pins,
    }
}

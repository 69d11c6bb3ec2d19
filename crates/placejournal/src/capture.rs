//! Capture flow for placejournal.
//!
//! A [`CaptureSession`] takes a photo, samples the current position and
//! commits the resulting [`Place`] to the journal. Device calls are awaited
//! one at a time; nothing runs in the background.
//!
//! ```text
//! Idle -> Capturing -> PhotoReady -> LocatingOptional -> Committed
//!              |
//!              +-> Cancelled | Denied
//! ```
//!
//! `Committed`, `Cancelled` and `Denied` are terminal. A session that
//! already holds a photo returns to where it was when a retake is cancelled
//! or refused, so the photo is not lost.

use tracing::{debug, info, warn};

use crate::device::{Camera, CameraOutcome, Capability, Locator};
use crate::error::{Error, Result};
use crate::journal::PlaceJournal;
use crate::place::{Coordinates, Place};

/// Where a capture session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// Nothing has happened yet.
    Idle,
    /// The camera is open.
    Capturing,
    /// A photo was taken; no position sampled yet.
    PhotoReady,
    /// A position was requested; it may or may not have been obtained.
    LocatingOptional,
    /// The place was saved.
    Committed,
    /// The user dismissed the camera before any photo was taken.
    Cancelled,
    /// Camera permission was refused before any photo was taken.
    Denied,
}

impl CaptureState {
    /// Check if no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled | Self::Denied)
    }

    /// Check if the session holds a photo that could be saved.
    #[must_use]
    pub fn has_photo(self) -> bool {
        matches!(self, Self::PhotoReady | Self::LocatingOptional)
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Capturing => write!(f, "capturing"),
            Self::PhotoReady => write!(f, "photo_ready"),
            Self::LocatingOptional => write!(f, "locating"),
            Self::Committed => write!(f, "committed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// One pass through the capture flow.
///
/// The session owns the candidate photo and position until [`commit`]
/// hands the finished place to the journal.
///
/// [`commit`]: CaptureSession::commit
pub struct CaptureSession<'a> {
    camera: &'a dyn Camera,
    locator: &'a dyn Locator,
    journal: &'a PlaceJournal,
    default_title: String,
    state: CaptureState,
    photo: Option<String>,
    location: Option<Coordinates>,
}

impl std::fmt::Debug for CaptureSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state)
            .field("photo", &self.photo)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl<'a> CaptureSession<'a> {
    /// Start a session in the `Idle` state.
    #[must_use]
    pub fn new(
        camera: &'a dyn Camera,
        locator: &'a dyn Locator,
        journal: &'a PlaceJournal,
        default_title: impl Into<String>,
    ) -> Self {
        Self {
            camera,
            locator,
            journal,
            default_title: default_title.into(),
            state: CaptureState::Idle,
            photo: None,
            location: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The photo taken so far.
    #[must_use]
    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref()
    }

    /// The position sampled so far.
    #[must_use]
    pub fn location(&self) -> Option<Coordinates> {
        self.location
    }

    /// Take a photo.
    ///
    /// Camera permission is requested on every call. A new photo replaces any
    /// earlier one and clears the position sampled for it.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] if camera access is refused.
    /// - [`Error::CaptureCancelled`] if the user dismisses the camera.
    /// - [`Error::CaptureFailed`] if the camera fails.
    /// - [`Error::InvalidTransition`] if the session is finished.
    pub async fn capture_photo(&mut self) -> Result<String> {
        let previous = self.state;
        if previous.is_terminal() || previous == CaptureState::Capturing {
            return Err(self.invalid("take a photo"));
        }

        self.state = CaptureState::Capturing;

        let permission = match self.camera.request_permission().await {
            Ok(permission) => permission,
            Err(e) => {
                self.state = previous;
                return Err(Error::CaptureFailed {
                    message: e.to_string(),
                });
            }
        };
        if !permission.is_granted() {
            info!("Camera permission denied");
            self.state = Self::fallback(previous, CaptureState::Denied);
            return Err(Error::PermissionDenied {
                capability: Capability::Camera,
            });
        }

        match self.camera.launch().await {
            Ok(CameraOutcome::Captured(uri)) if !uri.trim().is_empty() => {
                debug!(photo = %uri, "Photo captured");
                self.photo = Some(uri.clone());
                self.location = None;
                self.state = CaptureState::PhotoReady;
                Ok(uri)
            }
            Ok(CameraOutcome::Captured(_)) => {
                self.state = previous;
                Err(Error::CaptureFailed {
                    message: "camera returned an empty photo reference".to_string(),
                })
            }
            Ok(CameraOutcome::Cancelled) => {
                debug!("Camera dismissed");
                self.state = Self::fallback(previous, CaptureState::Cancelled);
                Err(Error::CaptureCancelled)
            }
            Err(e) => {
                warn!(error = %e, "Camera failed");
                self.state = previous;
                Err(Error::CaptureFailed {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Sample the current position for the photo.
    ///
    /// Location permission is requested on every call. Failure is soft: the
    /// session stays committable without coordinates.
    ///
    /// # Errors
    ///
    /// - [`Error::LocationUnavailable`] if permission is refused, no fix is
    ///   available or the fix is not a finite position within range.
    /// - [`Error::InvalidTransition`] if there is no photo yet.
    pub async fn sample_location(&mut self) -> Result<Coordinates> {
        if !self.state.has_photo() {
            return Err(self.invalid("sample location"));
        }
        self.state = CaptureState::LocatingOptional;

        let permission = self
            .locator
            .request_permission()
            .await
            .map_err(|e| Error::location_unavailable(e.to_string()))?;
        if !permission.is_granted() {
            info!("Location permission denied, place will not be marked on the map");
            return Err(Error::location_unavailable("permission denied"));
        }

        match self.locator.current_position().await {
            Ok(position) if !position.is_valid() => {
                warn!(%position, "Position out of range, ignoring it");
                Err(Error::location_unavailable(format!(
                    "position out of range: {position}"
                )))
            }
            Ok(position) => {
                debug!(%position, "Position sampled");
                self.location = Some(position);
                Ok(position)
            }
            Err(e) => {
                warn!(error = %e, "Position unavailable");
                Err(Error::location_unavailable(e.to_string()))
            }
        }
    }

    /// Take a photo and then try to sample the position.
    ///
    /// Location failure is logged and swallowed.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`capture_photo`](Self::capture_photo).
    pub async fn capture(&mut self) -> Result<String> {
        let photo = self.capture_photo().await?;
        if let Err(e) = self.sample_location().await {
            debug!(error = %e, "Continuing without coordinates");
        }
        Ok(photo)
    }

    /// Build the place and save it to the journal.
    ///
    /// A blank title becomes the default title. On failure the session keeps
    /// its photo so saving can be retried.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPhoto`] if no photo was taken; the journal is not
    ///   touched.
    /// - [`Error::InvalidTransition`] if the session is finished.
    /// - Any error from [`PlaceJournal::append`].
    pub fn commit(&mut self, title: &str) -> Result<Place> {
        if !self.state.has_photo() {
            if self.state.is_terminal() {
                return Err(self.invalid("save"));
            }
            return Err(Error::MissingPhoto);
        }
        let Some(photo) = self.photo.clone() else {
            return Err(Error::MissingPhoto);
        };

        let place = Place::new(title, &self.default_title, photo, self.location)?;
        self.journal.append(place.clone())?;

        self.state = CaptureState::Committed;
        Ok(place)
    }

    fn fallback(previous: CaptureState, terminal: CaptureState) -> CaptureState {
        if previous.has_photo() {
            previous
        } else {
            terminal
        }
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FixedCamera, FixedLocator, PermissionStatus, Shot};
    use crate::logging::init_test_logging;
    use crate::place::DEFAULT_TITLE;
    use crate::storage::{BlobStore, MemoryStore};

    /// Blob store whose writes always fail.
    #[derive(Debug, Default)]
    struct FullDisk {
        inner: MemoryStore,
    }

    impl BlobStore for FullDisk {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::internal("disk full"))
        }

        fn path(&self) -> &std::path::Path {
            self.inner.path()
        }
    }

    fn here() -> Coordinates {
        Coordinates::new(-23.5505, -46.6333)
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CaptureState::Idle.to_string(), "idle");
        assert_eq!(CaptureState::LocatingOptional.to_string(), "locating");
        assert_eq!(CaptureState::Committed.to_string(), "committed");
    }

    #[test]
    fn test_terminal_states() {
        assert!(CaptureState::Committed.is_terminal());
        assert!(CaptureState::Cancelled.is_terminal());
        assert!(CaptureState::Denied.is_terminal());
        assert!(!CaptureState::Idle.is_terminal());
        assert!(!CaptureState::PhotoReady.is_terminal());
    }

    #[tokio::test]
    async fn test_full_capture_with_location() {
        init_test_logging();
        let camera = FixedCamera::with_photo("file:///beach.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        assert_eq!(session.state(), CaptureState::Idle);
        session.capture_photo().await.unwrap();
        assert_eq!(session.state(), CaptureState::PhotoReady);
        session.sample_location().await.unwrap();
        assert_eq!(session.state(), CaptureState::LocatingOptional);

        let place = session.commit("Beach").unwrap();
        assert_eq!(session.state(), CaptureState::Committed);
        assert_eq!(place.title, "Beach");
        assert_eq!(place.photo, "file:///beach.jpg");
        assert_eq!(place.location, Some(here()));
        assert_eq!(journal.list().unwrap(), vec![place]);
    }

    #[tokio::test]
    async fn test_denied_location_commits_without_coordinates() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::denied();
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture_photo().await.unwrap();
        let err = session.sample_location().await.unwrap_err();
        assert!(err.is_soft());
        assert_eq!(session.state(), CaptureState::LocatingOptional);

        let place = session.commit("").unwrap();
        assert!(place.location.is_none());
        assert_eq!(place.title, DEFAULT_TITLE);
        assert_eq!(journal.list().unwrap()[0].id, place.id);
    }

    #[tokio::test]
    async fn test_no_fix_is_soft() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::new(PermissionStatus::Granted, None);
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture().await.unwrap();
        assert!(session.location().is_none());
        assert!(session.commit("x").is_ok());
    }

    #[tokio::test]
    async fn test_out_of_range_fix_is_dropped() {
        for position in [
            Coordinates::new(f64::NAN, 1.0),
            Coordinates::new(0.0, f64::NEG_INFINITY),
            Coordinates::new(12.0, 181.0),
        ] {
            let camera = FixedCamera::with_photo("file:///park.jpg");
            let locator = FixedLocator::at(position);
            let journal = PlaceJournal::in_memory();
            let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

            session.capture_photo().await.unwrap();
            let err = session.sample_location().await.unwrap_err();
            assert!(err.is_soft());
            assert!(session.location().is_none());

            let place = session.commit("Park").unwrap();
            assert!(place.location.is_none());

            // The journal stays readable and writable afterwards
            assert_eq!(journal.list().unwrap().len(), 1);
            let next = Place::new("Next", DEFAULT_TITLE, "file:///n.jpg", None).unwrap();
            journal.append(next).unwrap();
            assert_eq!(journal.list().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_commit_may_skip_location() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture_photo().await.unwrap();
        let place = session.commit("Quick").unwrap();
        assert!(place.location.is_none());
        assert_eq!(locator.permission_requests(), 0);
    }

    #[tokio::test]
    async fn test_camera_denied_is_terminal() {
        let camera = FixedCamera::new(PermissionStatus::Denied, Shot::Photo("file:///a.jpg".into()));
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        let err = session.capture_photo().await.unwrap_err();
        assert!(err.is_permission_error());
        assert_eq!(session.state(), CaptureState::Denied);
        assert!(session.photo().is_none());
        assert!(matches!(
            session.capture_photo().await,
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_leaves_no_side_effect() {
        let camera = FixedCamera::new(PermissionStatus::Granted, Shot::Cancel);
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        let err = session.capture().await.unwrap_err();
        assert!(matches!(err, Error::CaptureCancelled));
        assert_eq!(session.state(), CaptureState::Cancelled);
        assert!(session.photo().is_none());
        assert_eq!(locator.permission_requests(), 0);
        assert!(journal.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_camera_failure_returns_to_idle() {
        let camera = FixedCamera::new(PermissionStatus::Granted, Shot::Fail("jammed".into()));
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        let err = session.capture_photo().await.unwrap_err();
        assert!(matches!(err, Error::CaptureFailed { .. }));
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_permission_requested_on_every_capture() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture().await.unwrap();
        session.capture().await.unwrap();
        assert_eq!(camera.permission_requests(), 2);
        assert_eq!(locator.permission_requests(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_retake_keeps_photo() {
        let first = FixedCamera::with_photo("file:///first.jpg");
        let cancel = FixedCamera::new(PermissionStatus::Granted, Shot::Cancel);
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();

        let mut session = CaptureSession::new(&first, &locator, &journal, DEFAULT_TITLE);
        session.capture().await.unwrap();
        session.camera = &cancel;

        let err = session.capture_photo().await.unwrap_err();
        assert!(matches!(err, Error::CaptureCancelled));
        assert_eq!(session.state(), CaptureState::LocatingOptional);
        assert_eq!(session.photo(), Some("file:///first.jpg"));
        assert_eq!(session.location(), Some(here()));
    }

    #[tokio::test]
    async fn test_commit_without_photo_never_reaches_journal() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::new(FullDisk::default(), "places");
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        // A write would fail with StorageWrite; MissingPhoto proves it never ran.
        let err = session.commit("Beach").unwrap_err();
        assert!(matches!(err, Error::MissingPhoto));
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_empty_photo_from_camera_is_rejected() {
        let camera = FixedCamera::with_photo("");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        assert!(matches!(
            session.capture_photo().await,
            Err(Error::CaptureFailed { .. })
        ));
        assert!(matches!(session.commit("x"), Err(Error::MissingPhoto)));
        assert!(journal.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_allows_retry() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::new(FullDisk::default(), "places");
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture().await.unwrap();
        let err = session.commit("Beach").unwrap_err();
        assert!(matches!(err, Error::StorageWrite { .. }));
        assert_eq!(session.state(), CaptureState::LocatingOptional);
        assert!(journal.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_committed_session_is_finished() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        session.capture().await.unwrap();
        session.commit("Once").unwrap();

        assert!(matches!(
            session.commit("Twice"),
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(journal.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sample_location_requires_photo() {
        let camera = FixedCamera::with_photo("file:///a.jpg");
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();
        let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);

        assert!(matches!(
            session.sample_location().await,
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_two_captures_list_newest_first() {
        let locator = FixedLocator::at(here());
        let journal = PlaceJournal::in_memory();

        for (title, photo) in [("Beach", "file:///beach.jpg"), ("Park", "file:///park.jpg")] {
            let camera = FixedCamera::with_photo(photo);
            let mut session = CaptureSession::new(&camera, &locator, &journal, DEFAULT_TITLE);
            session.capture().await.unwrap();
            session.commit(title).unwrap();
        }

        let titles: Vec<String> = journal.list().unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Park", "Beach"]);
    }
}

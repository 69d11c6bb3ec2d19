//! Capability implementations with predetermined answers.
//!
//! The CLI builds these from configuration and command-line arguments so the
//! host machine can stand in for a phone; tests use them as scripted doubles.
//! Each keeps a count of permission requests so callers can check that a
//! flow asked again instead of reusing an earlier grant.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::{Biometrics, CameraOutcome, Camera, Locator, PermissionStatus};
use crate::error::{Error, Result};
use crate::place::Coordinates;

/// What a [`FixedCamera`] does when launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shot {
    /// Return this photo URI.
    Photo(String),
    /// Behave as if the user dismissed the camera.
    Cancel,
    /// Fail with this message.
    Fail(String),
}

/// A camera with a fixed permission answer and a fixed shot.
#[derive(Debug)]
pub struct FixedCamera {
    permission: PermissionStatus,
    shot: Shot,
    permission_requests: AtomicUsize,
}

impl FixedCamera {
    /// Create a camera that grants permission and returns `photo`.
    #[must_use]
    pub fn with_photo(photo: impl Into<String>) -> Self {
        Self::new(PermissionStatus::Granted, Shot::Photo(photo.into()))
    }

    /// Create a camera with the given permission answer and shot.
    #[must_use]
    pub fn new(permission: PermissionStatus, shot: Shot) -> Self {
        Self {
            permission,
            shot,
            permission_requests: AtomicUsize::new(0),
        }
    }

    /// Number of times permission was requested.
    #[must_use]
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Camera for FixedCamera {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        debug!(status = ?self.permission, "Camera permission requested");
        Ok(self.permission)
    }

    async fn launch(&self) -> Result<CameraOutcome> {
        match &self.shot {
            Shot::Photo(uri) => Ok(CameraOutcome::Captured(uri.clone())),
            Shot::Cancel => Ok(CameraOutcome::Cancelled),
            Shot::Fail(message) => Err(Error::device(message.clone())),
        }
    }
}

/// A locator with a fixed permission answer and an optional fixed position.
///
/// A locator without a position behaves like a device with no fix.
#[derive(Debug)]
pub struct FixedLocator {
    permission: PermissionStatus,
    position: Option<Coordinates>,
    permission_requests: AtomicUsize,
}

impl FixedLocator {
    /// Create a locator that grants permission and reports `position`.
    #[must_use]
    pub fn at(position: Coordinates) -> Self {
        Self::new(PermissionStatus::Granted, Some(position))
    }

    /// Create a locator that refuses permission.
    #[must_use]
    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, None)
    }

    /// Create a locator with the given permission answer and position.
    #[must_use]
    pub fn new(permission: PermissionStatus, position: Option<Coordinates>) -> Self {
        Self {
            permission,
            position,
            permission_requests: AtomicUsize::new(0),
        }
    }

    /// Number of times permission was requested.
    #[must_use]
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Locator for FixedLocator {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        debug!(status = ?self.permission, "Location permission requested");
        Ok(self.permission)
    }

    async fn current_position(&self) -> Result<Coordinates> {
        self.position
            .ok_or_else(|| Error::device("no position fix available"))
    }
}

/// Biometric hardware with fixed presence and a fixed challenge result.
#[derive(Debug, Clone, Copy)]
pub struct FixedBiometrics {
    hardware: bool,
    succeeds: bool,
}

impl FixedBiometrics {
    /// A device without biometric hardware.
    #[must_use]
    pub fn absent() -> Self {
        Self::new(false, false)
    }

    /// A device with biometric hardware whose challenge yields `succeeds`.
    #[must_use]
    pub fn present(succeeds: bool) -> Self {
        Self::new(true, succeeds)
    }

    /// Create biometrics with explicit hardware presence and result.
    #[must_use]
    pub fn new(hardware: bool, succeeds: bool) -> Self {
        Self { hardware, succeeds }
    }
}

#[async_trait::async_trait]
impl Biometrics for FixedBiometrics {
    async fn has_hardware(&self) -> Result<bool> {
        Ok(self.hardware)
    }

    async fn authenticate(&self, prompt: &str) -> Result<bool> {
        debug!(prompt, succeeds = self.succeeds, "Biometric challenge");
        Ok(self.succeeds)
    }
}

//! Device capability boundary.
//!
//! The camera, the position sensor and biometric authentication are owned by
//! the host platform. This module defines the traits the journal talks to;
//! every call is async and is awaited one at a time by the flows that use it.

pub mod fixed;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::place::Coordinates;

pub use fixed::{FixedBiometrics, FixedCamera, FixedLocator, Shot};

/// A device capability guarded by a user permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The camera.
    Camera,
    /// Foreground location.
    Location,
    /// Biometric authentication.
    Biometrics,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Location => write!(f, "location"),
            Self::Biometrics => write!(f, "biometrics"),
        }
    }
}

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user granted access.
    #[default]
    Granted,
    /// The user refused access.
    Denied,
}

impl PermissionStatus {
    /// Check if access was granted.
    #[must_use]
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// What came back from the camera UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraOutcome {
    /// A photo was taken; carries its local file URI.
    Captured(String),
    /// The user dismissed the camera.
    Cancelled,
}

/// The device camera.
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Ask for camera permission.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot answer the request.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Open the camera UI and wait for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera fails to produce a photo.
    async fn launch(&self) -> Result<CameraOutcome>;
}

/// The device position sensor.
#[async_trait::async_trait]
pub trait Locator: Send + Sync {
    /// Ask for foreground location permission.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cannot answer the request.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Sample the current position.
    ///
    /// # Errors
    ///
    /// Returns an error if no position fix is available.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Biometric authentication hardware.
#[async_trait::async_trait]
pub trait Biometrics: Send + Sync {
    /// Check for biometric hardware.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware check itself fails.
    async fn has_hardware(&self) -> Result<bool>;

    /// Challenge the user. Returns `true` on a successful match.
    ///
    /// # Errors
    ///
    /// Returns an error if the challenge cannot be presented.
    async fn authenticate(&self, prompt: &str) -> Result<bool>;
}

/// Pattern for references that already carry a URI scheme.
/// Matches a reference that already names a URI scheme.
static URI_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("URI scheme pattern is valid")
});

/// Resolve a photo reference to a URI.
///
/// References that already carry a scheme (`file://`, `content://`, ...) are
/// kept as-is. Anything else is treated as a local path, which must exist,
/// and is turned into an absolute `file://` URI.
///
/// # Errors
///
/// Returns [`Error::InvalidPhoto`] if the reference is empty or the path
/// does not exist.
pub fn photo_uri(reference: &str) -> Result<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidPhoto {
            reference: reference.to_string(),
            message: "empty reference".to_string(),
        });
    }

    if URI_SCHEME.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    let path = Path::new(trimmed)
        .canonicalize()
        .map_err(|e| Error::InvalidPhoto {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
    Ok(format!("file://{}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::Camera.to_string(), "camera");
        assert_eq!(Capability::Location.to_string(), "location");
        assert_eq!(Capability::Biometrics.to_string(), "biometrics");
    }

    #[test]
    fn test_permission_status() {
        assert!(PermissionStatus::Granted.is_granted());
        assert!(!PermissionStatus::Denied.is_granted());
        assert_eq!(PermissionStatus::default(), PermissionStatus::Granted);
    }

    #[test]
    fn test_permission_status_serde() {
        let json = serde_json::to_string(&PermissionStatus::Denied).unwrap();
        assert_eq!(json, "\"denied\"");
        let status: PermissionStatus = serde_json::from_str("\"granted\"").unwrap();
        assert_eq!(status, PermissionStatus::Granted);
    }

    #[test]
    fn test_photo_uri_keeps_existing_scheme() {
        assert_eq!(
            photo_uri("file:///data/photo.jpg").unwrap(),
            "file:///data/photo.jpg"
        );
        assert_eq!(
            photo_uri("content://media/external/images/1").unwrap(),
            "content://media/external/images/1"
        );
    }

    #[test]
    fn test_photo_uri_resolves_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let uri = photo_uri(path.to_str().unwrap()).unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("beach.jpg"));
    }

    #[test]
    fn test_photo_uri_rejects_missing_path() {
        let result = photo_uri("/nonexistent/photo.jpg");
        assert!(matches!(result, Err(Error::InvalidPhoto { .. })));
    }

    #[test]
    fn test_uri_scheme_shape() {
        assert!(URI_SCHEME.is_match("file:///a.jpg"));
        assert!(URI_SCHEME.is_match("ph+x.y-z://asset/1"));
        assert!(!URI_SCHEME.is_match("1file:///a.jpg"));
        assert!(!URI_SCHEME.is_match("photos/a.jpg"));
        assert!(!URI_SCHEME.is_match("C:/photos/a.jpg"));

        assert!(matches!(
            photo_uri("9x://not/a/scheme"),
            Err(Error::InvalidPhoto { .. })
        ));
    }

    #[test]
    fn test_photo_uri_rejects_empty() {
        assert!(matches!(photo_uri("  "), Err(Error::InvalidPhoto { .. })));
    }
}

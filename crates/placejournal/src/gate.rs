//! Device capability gate.
//!
//! Evaluated once per launch, before anything else runs. The gate asks for
//! camera and location permission and, if the device has biometric hardware,
//! challenges the user. It keeps no state after producing its outcome.

use tracing::{info, warn};

use crate::device::{Biometrics, Camera, Locator, PermissionStatus};

/// Prompt shown by the biometric challenge.
pub const AUTH_PROMPT: &str = "Authenticate to access the app";

/// Result of the startup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The app may be used.
    Ready,
    /// Camera or location permission was refused.
    PermissionsDenied,
    /// Biometric hardware is present and the challenge failed.
    AuthenticationFailed,
}

impl GateOutcome {
    /// Check if the app may be used.
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    /// Notice to show when the app may not be used.
    #[must_use]
    pub fn notice(self) -> Option<&'static str> {
        match self {
            Self::Ready => None,
            Self::PermissionsDenied => Some("Required permissions were not granted"),
            Self::AuthenticationFailed => Some("Authentication required"),
        }
    }
}

impl std::fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::PermissionsDenied => write!(f, "permissions_denied"),
            Self::AuthenticationFailed => write!(f, "authentication_failed"),
        }
    }
}

/// The startup capability check.
pub struct CapabilityGate<'a> {
    camera: &'a dyn Camera,
    locator: &'a dyn Locator,
    biometrics: &'a dyn Biometrics,
}

impl std::fmt::Debug for CapabilityGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityGate").finish_non_exhaustive()
    }
}

impl<'a> CapabilityGate<'a> {
    /// Create a gate over the given capabilities.
    #[must_use]
    pub fn new(
        camera: &'a dyn Camera,
        locator: &'a dyn Locator,
        biometrics: &'a dyn Biometrics,
    ) -> Self {
        Self {
            camera,
            locator,
            biometrics,
        }
    }

    /// Run the check.
    ///
    /// Camera permission is requested first, then location. Biometrics are
    /// only checked once both are granted. Missing biometric hardware passes.
    /// A capability call that fails outright counts as a refusal.
    pub async fn evaluate(&self) -> GateOutcome {
        let camera = self.camera.request_permission().await.unwrap_or_else(|e| {
            warn!(error = %e, "Camera permission request failed");
            PermissionStatus::Denied
        });
        let location = self.locator.request_permission().await.unwrap_or_else(|e| {
            warn!(error = %e, "Location permission request failed");
            PermissionStatus::Denied
        });

        if !(camera.is_granted() && location.is_granted()) {
            info!(?camera, ?location, "Required permissions not granted");
            return GateOutcome::PermissionsDenied;
        }

        let has_hardware = match self.biometrics.has_hardware().await {
            Ok(present) => present,
            Err(e) => {
                warn!(error = %e, "Biometric hardware check failed");
                return GateOutcome::AuthenticationFailed;
            }
        };
        if !has_hardware {
            info!("No biometric hardware, skipping authentication");
            return GateOutcome::Ready;
        }

        match self.biometrics.authenticate(AUTH_PROMPT).await {
            Ok(true) => GateOutcome::Ready,
            Ok(false) => {
                info!("Biometric authentication failed");
                GateOutcome::AuthenticationFailed
            }
            Err(e) => {
                warn!(error = %e, "Biometric challenge failed");
                GateOutcome::AuthenticationFailed
            }
        }
    }
}

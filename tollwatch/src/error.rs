//! Location error taxonomy.
//!
//! Provider-level failures are classified locally into three typed errors
//! before they cross the boundary to the application layer; raw platform
//! errors are never re-thrown. Numeric codes are part of the wire contract
//! with the consumer and must stay stable.

use serde_json::json;
use thiserror::Error;

/// Errors delivered to the application layer.
///
/// Each variant carries a stable numeric code and a human-readable message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The platform denied location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// A fix could not be produced (network or positioning failure,
    /// or location services turned off). Carries the specific message
    /// shown to the user.
    #[error("{0}")]
    PositionUnavailable(String),

    /// A one-shot position request exceeded its deadline.
    #[error("location request timed out")]
    Timeout,
}

impl LocationError {
    /// Stable numeric code for the wire contract.
    pub fn code(&self) -> u8 {
        match self {
            LocationError::PermissionDenied => 1,
            LocationError::PositionUnavailable(_) => 2,
            LocationError::Timeout => 3,
        }
    }

    /// Serialize as the `{code, message}` payload the consumer expects.
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }

    /// Position-unavailable error with the generic retrieval message.
    pub fn unavailable() -> Self {
        LocationError::PositionUnavailable("unable to retrieve location".to_string())
    }

    /// Position-unavailable error caused by a network failure.
    pub fn network_unavailable() -> Self {
        LocationError::PositionUnavailable(
            "unable to retrieve location due to a network failure".to_string(),
        )
    }

    /// Position-unavailable error reported while services are disabled.
    pub fn services_off() -> Self {
        LocationError::PositionUnavailable("location services are turned off".to_string())
    }
}

/// Raw failure categories reported by the platform provider.
///
/// This is the only provider error surface the engine understands; the
/// adapter around the real platform collapses its error space into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    /// Access denied by the user or policy.
    Denied,
    /// Network-level positioning failure.
    Network,
    /// Any other provider failure.
    Other,
}

/// Classify a provider failure into the public taxonomy.
///
/// `services_enabled` distinguishes a denial caused by the global location
/// switch from a per-app permission denial.
pub fn classify_failure(failure: ProviderFailure, services_enabled: bool) -> LocationError {
    match failure {
        ProviderFailure::Denied if !services_enabled => LocationError::services_off(),
        ProviderFailure::Denied => LocationError::PermissionDenied,
        ProviderFailure::Network => LocationError::network_unavailable(),
        ProviderFailure::Other => LocationError::unavailable(),
    }
}

//! The platform location provider seam.
//!
//! [`LocationProvider`] is the explicit outbound interface to whatever
//! actually produces fixes and region callbacks (a platform location
//! service in production, [`SimulatedProvider`] in tests and the replay
//! CLI). The engine only commands the provider; results come back through
//! the engine's provider-callback surface, keeping the two directions
//! decoupled the way the rest of this crate keeps its seams.

mod simulated;

pub use simulated::SimulatedProvider;

use crate::auth::{AuthorizationLevel, PlatformAuthStatus};
use crate::region::MonitoredRegion;

/// Default distance filter in meters when no value is configured.
pub const DEFAULT_DISTANCE_FILTER_M: f64 = 20.0;

/// Accuracy hint for a fix request.
///
/// Both variants currently map to the platform's best accuracy, matching
/// the behavior this engine replaces; adapters may differentiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    /// Highest available accuracy.
    High,
    /// Standard accuracy.
    Standard,
}

/// Options for continuous observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserveOptions {
    /// Minimum movement in meters between delivered updates.
    pub distance_filter_m: f64,
    /// Request the highest available accuracy.
    pub high_accuracy: bool,
    /// Use significant-change monitoring instead of standard updates.
    pub use_significant_changes: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
            high_accuracy: false,
            use_significant_changes: false,
        }
    }
}

/// Which provider session produced a fix.
///
/// Continuous observation and one-shot requests use logically independent
/// sessions; the request id correlates one-shot results with the request
/// that issued them so late results can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSource {
    /// The long-lived continuous observation session.
    Continuous,
    /// An ephemeral single-fix session.
    SingleFix {
        /// Id assigned when the fix was requested.
        request_id: u64,
    },
}

/// Commands the engine issues to the platform location service.
///
/// Implementations must be callable from the engine task without
/// blocking; platform adapters dispatch onto their own context.
pub trait LocationProvider: Send + Sync {
    /// Whether location services are globally enabled on the device.
    fn services_enabled(&self) -> bool;

    /// Current platform authorization status.
    fn authorization_status(&self) -> PlatformAuthStatus;

    /// Prompt the user for authorization at the given level.
    fn request_authorization(&self, level: AuthorizationLevel);

    /// Request a single fix on an ephemeral session tagged `request_id`.
    fn request_single_fix(&self, request_id: u64, accuracy: Accuracy, distance_filter_m: f64);

    /// Cancel an in-flight single-fix session; late results must not be
    /// delivered for a cancelled id.
    fn cancel_single_fix(&self, request_id: u64);

    /// Start (or reconfigure) continuous observation.
    fn start_updates(&self, options: &ObserveOptions);

    /// Stop continuous observation, whichever mode it was started in.
    fn stop_updates(&self);

    /// Switch to significant-change monitoring.
    fn start_significant_change_updates(&self);

    /// Apply a new distance filter to the live session.
    fn set_distance_filter(&self, meters: f64);

    /// Begin monitoring a circular region.
    fn start_monitoring(&self, region: &MonitoredRegion);

    /// Stop monitoring the region with this composite id.
    fn stop_monitoring(&self, composite_id: &str);

    /// Navigate the user to the platform's location settings.
    fn open_location_settings(&self);
}

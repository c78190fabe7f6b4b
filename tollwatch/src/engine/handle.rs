//! Consumer and platform-adapter handles to the engine task.

use tokio::sync::{mpsc, oneshot};

use crate::auth::{AuthorizationLevel, AuthorizationState, PlatformAuthStatus};
use crate::error::{LocationError, ProviderFailure};
use crate::position::Position;
use crate::provider::{FixSource, ObserveOptions};
use crate::request::RequestOptions;

use super::{Command, ProviderEvent};

/// Snapshot returned by [`EngineHandle::get_location_status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationStatus {
    /// Last known latitude, 0.0 before the first fix.
    pub latitude: f64,
    /// Last known longitude, 0.0 before the first fix.
    pub longitude: f64,
    /// Whether the consumer should show its authorization prompt flow.
    pub needs_prompt: bool,
}

/// Consumer-facing command surface.
///
/// Cloneable; all methods enqueue onto the engine task and never block.
/// Fire-and-forget methods silently do nothing once the engine has shut
/// down, mirroring the platform they front.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Handle for the platform adapter's inbound callbacks.
    pub fn provider_callbacks(&self) -> ProviderCallbacks {
        ProviderCallbacks {
            tx: self.tx.clone(),
        }
    }

    /// Request authorization at the given level.
    ///
    /// Resolves immediately for terminal platform states; otherwise waits
    /// for the user's answer. Returns `None` when the engine is gone or
    /// when this request was displaced by a newer one — at most one
    /// authorization request is pending at a time, and a second call
    /// overwrites the first (the earlier caller is never resolved).
    pub async fn request_authorization(
        &self,
        level: AuthorizationLevel,
    ) -> Option<AuthorizationState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::RequestAuthorization { level, reply })
            .ok()?;
        rx.await.ok()
    }

    /// Resolve the current position.
    ///
    /// Serves a sufficiently fresh cached position without touching the
    /// provider; otherwise issues a one-shot fix request honoring the
    /// options' timeout. Exactly one terminal outcome is returned.
    pub async fn get_current_position(
        &self,
        options: RequestOptions,
    ) -> Result<Position, LocationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::GetCurrentPosition { options, reply })
            .map_err(|_| LocationError::unavailable())?;
        rx.await.map_err(|_| LocationError::unavailable())?
    }

    /// Start continuous observation.
    pub fn start_location_update(&self, options: ObserveOptions) {
        let _ = self.tx.send(Command::StartLocationUpdate { options });
    }

    /// Stop continuous observation. Pending one-shot requests are not
    /// affected; they use an independent provider session.
    pub fn stop_location_update(&self) {
        let _ = self.tx.send(Command::StopLocationUpdate);
    }

    /// Add a geofence from a `lat*lon*id*label*radius` descriptor.
    ///
    /// Malformed descriptors and adds beyond the monitored-region
    /// capacity are silently ignored; call [`Self::reset_geofences`] to
    /// free capacity.
    pub fn add_geofence(&self, descriptor: &str) {
        let _ = self.tx.send(Command::AddGeofence {
            descriptor: descriptor.to_string(),
        });
    }

    /// Reconcile monitored regions against a comma-separated list of
    /// composite ids the consumer still considers entered; everything
    /// else stops being monitored.
    pub fn reset_geofences(&self, entered_csv: &str) {
        let _ = self.tx.send(Command::ResetGeofences {
            entered_csv: entered_csv.to_string(),
        });
    }

    /// Persist a new distance-filter default and apply it to the live
    /// session. Zero means "unset" and applies the 20 m default.
    pub fn set_distance_filter(&self, meters: f64) {
        let _ = self.tx.send(Command::SetDistanceFilter { meters });
    }

    /// Last known coordinates and whether an authorization prompt is due.
    pub async fn get_location_status(&self) -> Option<LocationStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::GetLocationStatus { reply }).ok()?;
        rx.await.ok()
    }

    /// Navigate the user to the platform location settings.
    pub fn open_location_settings(&self) {
        let _ = self.tx.send(Command::OpenLocationSettings);
    }

    /// Stop monitoring every region; used before full reconfiguration.
    pub fn stop_all_monitoring(&self) {
        let _ = self.tx.send(Command::StopAllMonitoring);
    }
}

/// Inbound interface for the platform adapter.
///
/// The adapter around the real location service calls these as its
/// delegate callbacks fire; each enqueues onto the engine task, so the
/// adapter never touches engine state directly.
#[derive(Debug, Clone)]
pub struct ProviderCallbacks {
    tx: mpsc::UnboundedSender<Command>,
}

impl ProviderCallbacks {
    fn send(&self, event: ProviderEvent) {
        // Engine shut down; platform callbacks have nowhere to go.
        let _ = self.tx.send(Command::Provider(event));
    }

    /// A new position was observed.
    pub fn on_position_update(&self, source: FixSource, position: Position) {
        self.send(ProviderEvent::PositionUpdate { source, position });
    }

    /// A provider session failed.
    pub fn on_position_failure(&self, source: FixSource, failure: ProviderFailure) {
        self.send(ProviderEvent::PositionFailure { source, failure });
    }

    /// The device entered a monitored region.
    pub fn on_region_entered(&self, composite_id: &str) {
        self.send(ProviderEvent::RegionEntered {
            composite_id: composite_id.to_string(),
        });
    }

    /// The device exited a monitored region.
    pub fn on_region_exited(&self, composite_id: &str) {
        self.send(ProviderEvent::RegionExited {
            composite_id: composite_id.to_string(),
        });
    }

    /// Platform authorization changed.
    pub fn on_authorization_changed(&self, status: PlatformAuthStatus) {
        self.send(ProviderEvent::AuthorizationChanged { status });
    }

    /// Region monitoring became active.
    pub fn on_region_monitoring_started(&self, composite_id: &str) {
        self.send(ProviderEvent::MonitoringStarted {
            composite_id: composite_id.to_string(),
        });
    }

    /// Region monitoring could not be established.
    pub fn on_region_monitoring_failed(&self, composite_id: &str) {
        self.send(ProviderEvent::MonitoringFailed {
            composite_id: composite_id.to_string(),
        });
    }
}

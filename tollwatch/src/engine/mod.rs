//! The location engine: command surface, provider callbacks, event routing.
//!
//! All mutable state (position cache, movement gate, region registry,
//! pending request slots) lives inside a single [`LocationEngine`] task.
//! Consumers and the platform adapter talk to it over a channel:
//!
//! ```text
//! EngineHandle ──────┐
//!   (consumer        │ Command
//!    commands)       ▼
//!               ┌──────────────────┐        ┌───────────┐
//!               │  LocationEngine  │──emit──► EventSink │──► UI layer
//!               │  (single owner)  │        └───────────┘
//!               └──▲────────┬──────┘
//!        Command   │        │ commands
//! ProviderCallbacks┘        ▼
//!   (platform         LocationProvider
//!    adapter)          (platform)
//! ```
//!
//! This enforces the single-logical-owner model: no locking, no shared
//! mutable state, and continuations (oneshot reply senders) that fire at
//! most once by construction.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tollwatch::engine::LocationEngine;
//! use tollwatch::events::ChannelSink;
//! use tollwatch::provider::SimulatedProvider;
//! use tollwatch::settings::Settings;
//! use tokio_util::sync::CancellationToken;
//!
//! let provider = Arc::new(SimulatedProvider::new());
//! let (sink, mut events) = ChannelSink::new();
//! let (engine, handle) = LocationEngine::new(provider, Arc::new(sink), Settings::default_location());
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(engine.run(shutdown.clone()));
//!
//! handle.add_geofence("17.7072867*83.3000947*T1*MainGate*120");
//! ```

mod daemon;
mod handle;

pub use daemon::LocationEngine;
pub use handle::{EngineHandle, LocationStatus, ProviderCallbacks};

use crate::auth::{AuthorizationLevel, AuthorizationState, PlatformAuthStatus};
use crate::error::{LocationError, ProviderFailure};
use crate::position::Position;
use crate::provider::{FixSource, ObserveOptions};
use crate::request::RequestOptions;
use tokio::sync::oneshot;

/// Callbacks delivered by the platform adapter.
#[derive(Debug)]
pub enum ProviderEvent {
    /// A new position was observed on some provider session.
    PositionUpdate {
        source: FixSource,
        position: Position,
    },

    /// A provider session failed to produce a position.
    PositionFailure {
        source: FixSource,
        failure: ProviderFailure,
    },

    /// The device entered a monitored region.
    RegionEntered { composite_id: String },

    /// The device exited a monitored region.
    RegionExited { composite_id: String },

    /// Platform authorization changed (user answered a prompt, or
    /// settings changed out from under us).
    AuthorizationChanged { status: PlatformAuthStatus },

    /// Monitoring became active for a region.
    MonitoringStarted { composite_id: String },

    /// Monitoring could not be established for a region.
    MonitoringFailed { composite_id: String },
}

/// Messages processed by the engine task.
pub(crate) enum Command {
    RequestAuthorization {
        level: AuthorizationLevel,
        reply: oneshot::Sender<AuthorizationState>,
    },
    GetCurrentPosition {
        options: RequestOptions,
        reply: oneshot::Sender<Result<Position, LocationError>>,
    },
    StartLocationUpdate {
        options: ObserveOptions,
    },
    StopLocationUpdate,
    AddGeofence {
        descriptor: String,
    },
    ResetGeofences {
        entered_csv: String,
    },
    SetDistanceFilter {
        meters: f64,
    },
    GetLocationStatus {
        reply: oneshot::Sender<LocationStatus>,
    },
    OpenLocationSettings,
    StopAllMonitoring,
    Provider(ProviderEvent),
}

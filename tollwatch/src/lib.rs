//! Tollwatch - toll-plaza geofencing and movement events
//!
//! This library is the logic layer between a platform location provider
//! and an application that reacts to "near toll plaza", "exited toll
//! plaza", "moved more than a kilometer", and plain location-changed
//! signals. It manages a capacity-bounded set of circular geofences,
//! classifies movement against a rolling reference point, serves one-shot
//! position requests with caching and timeouts, and routes provider
//! callbacks into named output events.

pub mod auth;
pub mod coord;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod position;
pub mod provider;
pub mod region;
pub mod request;
pub mod settings;

pub use auth::{AuthorizationLevel, AuthorizationState};
pub use engine::{EngineHandle, LocationEngine, LocationStatus, ProviderCallbacks};
pub use error::{LocationError, ProviderFailure};
pub use events::{ChannelSink, Event, EventSink};
pub use gate::{DistanceGate, MovementClass, MOVEMENT_THRESHOLD_M};
pub use position::{Position, PositionCache};
pub use provider::{Accuracy, FixSource, LocationProvider, ObserveOptions, SimulatedProvider};
pub use region::{GeofenceDescriptor, MonitoredRegion, RegionRegistry, MAX_MONITORED_REGIONS};
pub use request::RequestOptions;
pub use settings::Settings;

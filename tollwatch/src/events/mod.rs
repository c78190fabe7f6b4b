//! Named output events delivered to the application layer.
//!
//! The engine never talks to the UI transport directly; it emits typed
//! [`Event`]s through an [`EventSink`]. Each event carries a stable wire
//! name and a JSON payload matching what the consumer application already
//! expects, so the transport adapter is a thin pass-through.

use serde_json::json;

use crate::error::LocationError;
use crate::position::Position;

/// An event emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Full position payload while continuous observation is active.
    GeolocationDidChange(Position),

    /// Classified location failure while continuous observation is active.
    GeolocationError(LocationError),

    /// The device entered a monitored region.
    NearToll {
        latitude: f64,
        longitude: f64,
        region_id: String,
        label: String,
    },

    /// The device exited a monitored region.
    ExitedToll {
        latitude: f64,
        longitude: f64,
        region_id: String,
        label: String,
    },

    /// The device moved beyond the movement threshold; the consumer
    /// should refresh its nearby-plaza list.
    TollListRefresh { latitude: f64, longitude: f64 },

    /// Sub-threshold movement; plain coordinate update.
    LocationUpdate { latitude: f64, longitude: f64 },

    /// Platform region monitoring failed for a region.
    MonitorFailed { composite_id: String },
}

impl Event {
    /// Stable wire name used by the event transport.
    pub fn name(&self) -> &'static str {
        match self {
            Event::GeolocationDidChange(_) => "geolocationDidChange",
            Event::GeolocationError(_) => "geolocationError",
            Event::NearToll { .. } => "nearTOToll",
            Event::ExitedToll { .. } => "didExitFromToll",
            Event::TollListRefresh { .. } => "callTOTollsList",
            Event::LocationUpdate { .. } => "locationUpdates",
            Event::MonitorFailed { .. } => "monitorFailed",
        }
    }

    /// JSON body in the shape the consumer application expects.
    ///
    /// Region and movement events use positional arrays; position and
    /// error events use their structured payloads.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Event::GeolocationDidChange(position) => position.payload(),
            Event::GeolocationError(error) => error.payload(),
            Event::NearToll {
                latitude,
                longitude,
                region_id,
                label,
            }
            | Event::ExitedToll {
                latitude,
                longitude,
                region_id,
                label,
            } => json!([latitude, longitude, region_id, label]),
            Event::TollListRefresh {
                latitude,
                longitude,
            }
            | Event::LocationUpdate {
                latitude,
                longitude,
            } => json!([latitude, longitude]),
            Event::MonitorFailed { composite_id } => json!([composite_id]),
        }
    }
}

/// Transport seam between the engine and the application layer.
///
/// Implementations must be cheap and non-blocking; the engine emits from
/// its single owner task.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: Event);
}

/// Sink forwarding events into an unbounded channel.
///
/// The receiving half is handed to the transport (or a test) to drain.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver to drain it.
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        // Receiver dropped means the transport is gone; nothing to do.
        let _ = self.tx.send(event);
    }
}

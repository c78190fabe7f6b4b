//! Movement classification against a rolling reference point.
//!
//! Providers deliver a noisy stream of frequent small-radius updates. The
//! gate converts that stream into a coarse "worth recomputing nearby
//! geofences" signal: it compares each fix to a rolling reference point and
//! only reports significant movement once the device has travelled at least
//! [`MOVEMENT_THRESHOLD_M`] from it, advancing the reference when it does.
//! This bounds how often the expensive geofence reconciliation runs.

use crate::coord::{great_circle_distance_m, Coordinate};

/// Distance the device must travel before movement counts as significant.
pub const MOVEMENT_THRESHOLD_M: f64 = 1000.0;

/// Classification of a single position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementClass {
    /// Cumulative movement from the reference point crossed the threshold.
    MovedFar,
    /// Still within the threshold of the reference point.
    MovedNear,
}

impl std::fmt::Display for MovementClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementClass::MovedFar => write!(f, "far"),
            MovementClass::MovedNear => write!(f, "near"),
        }
    }
}

/// Stateful movement detector.
///
/// Owns the rolling reference point exclusively. The reference is set by
/// the first observed position and thereafter advances only when a fix
/// lands at least the threshold distance away; sub-threshold movement
/// never moves it.
#[derive(Debug, Default)]
pub struct DistanceGate {
    reference: Option<Coordinate>,
}

impl DistanceGate {
    /// Create a gate with no reference point yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current reference point, if one has been established.
    pub fn reference(&self) -> Option<Coordinate> {
        self.reference
    }

    /// Classify a position update, advancing the reference on far moves.
    ///
    /// Rules, in order:
    /// 1. The first position ever observed establishes the reference and
    ///    classifies as near, so startup never produces a false far signal.
    /// 2. A fix exactly equal to the reference is near.
    /// 3. An origin (0, 0) fix after initialization is a provider glitch:
    ///    near, and the reference is left untouched.
    /// 4. Otherwise the great-circle distance to the reference decides;
    ///    at or beyond the threshold the reference advances to the fix.
    pub fn classify(&mut self, current: Coordinate) -> MovementClass {
        let reference = match self.reference {
            None => {
                self.reference = Some(current);
                return MovementClass::MovedNear;
            }
            Some(reference) => reference,
        };

        if current == reference {
            return MovementClass::MovedNear;
        }

        if current.is_origin() {
            return MovementClass::MovedNear;
        }

        let distance = great_circle_distance_m(reference, current);
        if distance >= MOVEMENT_THRESHOLD_M {
            tracing::debug!(
                from = %reference,
                to = %current,
                distance_m = distance,
                "movement threshold crossed, advancing reference"
            );
            self.reference = Some(current);
            MovementClass::MovedFar
        } else {
            MovementClass::MovedNear
        }
    }
}

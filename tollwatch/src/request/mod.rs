//! One-shot position request options and pending-request state.
//!
//! A current-position call is asynchronous from the caller's perspective
//! but never blocks the engine: it is pending state plus a deadline in the
//! engine's select loop. The state machine is an explicit tagged enum so
//! success, failure, and timeout are mutually exclusive terminal
//! transitions; exactly one of them consumes the reply sender.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::LocationError;
use crate::position::Position;

/// Options for a one-shot position request.
///
/// `None` durations mean unbounded: no maximum age always accepts a cached
/// position, and no timeout waits for the provider indefinitely. A `None`
/// distance filter falls back to the persisted configuration default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Minimum movement in meters for the fix session; `None` uses the
    /// persisted default.
    pub distance_filter_m: Option<f64>,
    /// Request the highest available accuracy.
    pub high_accuracy: bool,
    /// Maximum acceptable age of a cached position.
    pub max_age: Option<Duration>,
    /// Deadline for the provider to produce a fix.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// The armed deadline for these options, if any.
    ///
    /// A zero timeout counts as "no deadline", matching the consumer
    /// contract where only finite positive timeouts arm the timer.
    pub fn deadline_from_now(&self) -> Option<Instant> {
        self.timeout
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t)
    }
}

/// Reply channel for a one-shot request.
pub type FixReply = oneshot::Sender<Result<Position, LocationError>>;

/// A single in-flight fix request.
#[derive(Debug)]
pub struct PendingFix {
    /// Correlates provider results with this request.
    pub request_id: u64,
    /// Fires exactly once with the terminal outcome.
    pub reply: FixReply,
    /// When the request times out, if a timeout was set.
    pub deadline: Option<Instant>,
}

/// Explicit state of the one-shot request slot.
#[derive(Debug, Default)]
pub enum OneShotState {
    /// No request in flight.
    #[default]
    Idle,
    /// A request is awaiting its fix.
    Pending(PendingFix),
}

impl OneShotState {
    /// True when a request is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, OneShotState::Pending(_))
    }

    /// The pending request's deadline, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            OneShotState::Pending(fix) => fix.deadline,
            OneShotState::Idle => None,
        }
    }

    /// Arm a new pending request, returning any displaced one.
    ///
    /// A second request while one is in flight displaces the first; the
    /// caller must cancel the displaced provider session. The displaced
    /// reply sender is dropped, so its receiver observes closure.
    pub fn arm(&mut self, fix: PendingFix) -> Option<PendingFix> {
        let previous = std::mem::replace(self, OneShotState::Pending(fix));
        match previous {
            OneShotState::Pending(displaced) => {
                tracing::warn!(
                    request_id = displaced.request_id,
                    "one-shot request displaced by a newer call"
                );
                Some(displaced)
            }
            OneShotState::Idle => None,
        }
    }

    /// Take the pending request if `request_id` matches it.
    ///
    /// A non-matching id is a late result from a cancelled or displaced
    /// session and leaves the state untouched.
    pub fn complete(&mut self, request_id: u64) -> Option<PendingFix> {
        let matched = matches!(self, OneShotState::Pending(fix) if fix.request_id == request_id);
        if !matched {
            return None;
        }
        match std::mem::take(self) {
            OneShotState::Pending(fix) => Some(fix),
            OneShotState::Idle => None,
        }
    }

    /// Take the pending request because its deadline fired.
    pub fn expire(&mut self) -> Option<PendingFix> {
        match std::mem::take(self) {
            OneShotState::Pending(fix) => Some(fix),
            OneShotState::Idle => None,
        }
    }
}

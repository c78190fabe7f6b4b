//! Authorization states and the pending-request slot.
//!
//! The platform reports its own authorization status; the engine collapses
//! it into the consumer-facing [`AuthorizationState`] and, when the user has
//! not decided yet, parks the caller's reply sender until the provider's
//! authorization-changed notification arrives.

use tokio::sync::oneshot;

/// Authorization level a consumer can request from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationLevel {
    /// Access while the application is in use.
    WhenInUse,
    /// Access at any time, including in the background.
    Always,
}

impl AuthorizationLevel {
    /// Parse the wire string used by the command surface.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "whenInUse" => Some(AuthorizationLevel::WhenInUse),
            "always" => Some(AuthorizationLevel::Always),
            _ => None,
        }
    }
}

/// Raw authorization status as reported by the platform provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformAuthStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access restricted by device policy.
    Restricted,
    /// The user denied access.
    Denied,
    /// Granted for background use.
    AuthorizedAlways,
    /// Granted while in use.
    AuthorizedWhenInUse,
}

/// Authorization state delivered to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    /// Location services are globally disabled.
    Disabled,
    /// Access granted (either level).
    Granted,
    /// Access denied by the user.
    Denied,
    /// Access restricted by device policy.
    Restricted,
    /// The user has not decided yet.
    Undetermined,
}

impl AuthorizationState {
    /// Wire string for the command surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationState::Disabled => "disabled",
            AuthorizationState::Granted => "granted",
            AuthorizationState::Denied => "denied",
            AuthorizationState::Restricted => "restricted",
            AuthorizationState::Undetermined => "undetermined",
        }
    }

    /// Map a platform status to the consumer-facing state.
    pub fn from_platform(status: PlatformAuthStatus) -> Self {
        match status {
            PlatformAuthStatus::AuthorizedAlways | PlatformAuthStatus::AuthorizedWhenInUse => {
                AuthorizationState::Granted
            }
            PlatformAuthStatus::Denied => AuthorizationState::Denied,
            PlatformAuthStatus::Restricted => AuthorizationState::Restricted,
            PlatformAuthStatus::NotDetermined => AuthorizationState::Undetermined,
        }
    }
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot holding at most one pending authorization reply.
///
/// A second request while one is pending replaces the stored sender; the
/// displaced caller's receiver observes channel closure and is never
/// resolved with a state. This fire-once-overwrite behavior is part of the
/// documented contract, not a queue.
#[derive(Debug, Default)]
pub struct AuthorizationSlot {
    pending: Option<oneshot::Sender<AuthorizationState>>,
}

impl AuthorizationSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a request is waiting for the platform's notification.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Park a reply sender, displacing any earlier one.
    pub fn park(&mut self, reply: oneshot::Sender<AuthorizationState>) {
        if self.pending.is_some() {
            tracing::warn!("authorization request already pending, earlier caller displaced");
        }
        self.pending = Some(reply);
    }

    /// Resolve the pending request from a platform notification.
    ///
    /// A `NotDetermined` notification means the user is still deciding and
    /// resolves nothing. Returns true when a parked caller was resolved.
    pub fn resolve(&mut self, status: PlatformAuthStatus) -> bool {
        if status == PlatformAuthStatus::NotDetermined {
            return false;
        }
        match self.pending.take() {
            Some(reply) => {
                let _ = reply.send(AuthorizationState::from_platform(status));
                true
            }
            None => false,
        }
    }
}

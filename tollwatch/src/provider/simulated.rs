//! A scriptable, recording provider for tests and trace replay.

use parking_lot::Mutex;

use crate::auth::{AuthorizationLevel, PlatformAuthStatus};
use crate::region::MonitoredRegion;

use super::{Accuracy, LocationProvider, ObserveOptions};

#[derive(Debug, Default)]
struct Recorded {
    single_fix_requests: Vec<(u64, Accuracy, f64)>,
    cancelled_fixes: Vec<u64>,
    auth_prompts: Vec<AuthorizationLevel>,
    updates_started: Vec<ObserveOptions>,
    updates_stopped: usize,
    significant_change_starts: usize,
    distance_filters: Vec<f64>,
    monitoring_started: Vec<String>,
    monitoring_stopped: Vec<String>,
    settings_opened: usize,
}

/// In-memory [`LocationProvider`] that records every command.
///
/// Tests script the platform side by setting the reported authorization
/// status and services switch, then assert on what the engine commanded.
/// The replay CLI uses it as a stand-in platform while it feeds recorded
/// fixes through the engine's callback surface.
#[derive(Debug)]
pub struct SimulatedProvider {
    services_enabled: Mutex<bool>,
    auth_status: Mutex<PlatformAuthStatus>,
    recorded: Mutex<Recorded>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProvider {
    /// Provider with services enabled and authorization granted.
    pub fn new() -> Self {
        Self {
            services_enabled: Mutex::new(true),
            auth_status: Mutex::new(PlatformAuthStatus::AuthorizedWhenInUse),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Set the reported global services switch.
    pub fn set_services_enabled(&self, enabled: bool) {
        *self.services_enabled.lock() = enabled;
    }

    /// Set the reported platform authorization status.
    pub fn set_authorization_status(&self, status: PlatformAuthStatus) {
        *self.auth_status.lock() = status;
    }

    /// Number of single-fix requests issued so far.
    pub fn single_fix_count(&self) -> usize {
        self.recorded.lock().single_fix_requests.len()
    }

    /// The most recent single-fix request, if any.
    pub fn last_single_fix(&self) -> Option<(u64, Accuracy, f64)> {
        self.recorded.lock().single_fix_requests.last().copied()
    }

    /// Ids of cancelled single-fix sessions, in cancellation order.
    pub fn cancelled_fixes(&self) -> Vec<u64> {
        self.recorded.lock().cancelled_fixes.clone()
    }

    /// Authorization prompts issued, in order.
    pub fn auth_prompts(&self) -> Vec<AuthorizationLevel> {
        self.recorded.lock().auth_prompts.clone()
    }

    /// Options of every continuous-observation start, in order.
    pub fn updates_started(&self) -> Vec<ObserveOptions> {
        self.recorded.lock().updates_started.clone()
    }

    /// Number of continuous-observation stops.
    pub fn updates_stopped(&self) -> usize {
        self.recorded.lock().updates_stopped
    }

    /// Number of significant-change monitoring starts.
    pub fn significant_change_starts(&self) -> usize {
        self.recorded.lock().significant_change_starts
    }

    /// Distance filters applied to the live session, in order.
    pub fn distance_filters(&self) -> Vec<f64> {
        self.recorded.lock().distance_filters.clone()
    }

    /// Composite ids for which monitoring was started, in order.
    pub fn monitoring_started(&self) -> Vec<String> {
        self.recorded.lock().monitoring_started.clone()
    }

    /// Composite ids for which monitoring was stopped, in order.
    pub fn monitoring_stopped(&self) -> Vec<String> {
        self.recorded.lock().monitoring_stopped.clone()
    }

    /// Number of times the settings screen was opened.
    pub fn settings_opened(&self) -> usize {
        self.recorded.lock().settings_opened
    }
}

impl LocationProvider for SimulatedProvider {
    fn services_enabled(&self) -> bool {
        *self.services_enabled.lock()
    }

    fn authorization_status(&self) -> PlatformAuthStatus {
        *self.auth_status.lock()
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        self.recorded.lock().auth_prompts.push(level);
    }

    fn request_single_fix(&self, request_id: u64, accuracy: Accuracy, distance_filter_m: f64) {
        self.recorded
            .lock()
            .single_fix_requests
            .push((request_id, accuracy, distance_filter_m));
    }

    fn cancel_single_fix(&self, request_id: u64) {
        self.recorded.lock().cancelled_fixes.push(request_id);
    }

    fn start_updates(&self, options: &ObserveOptions) {
        self.recorded.lock().updates_started.push(*options);
    }

    fn stop_updates(&self) {
        self.recorded.lock().updates_stopped += 1;
    }

    fn start_significant_change_updates(&self) {
        self.recorded.lock().significant_change_starts += 1;
    }

    fn set_distance_filter(&self, meters: f64) {
        self.recorded.lock().distance_filters.push(meters);
    }

    fn start_monitoring(&self, region: &MonitoredRegion) {
        self.recorded
            .lock()
            .monitoring_started
            .push(region.composite_id.clone());
    }

    fn stop_monitoring(&self, composite_id: &str) {
        self.recorded
            .lock()
            .monitoring_stopped
            .push(composite_id.to_string());
    }

    fn open_location_settings(&self) {
        self.recorded.lock().settings_opened += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_single_fix_requests() {
        let provider = SimulatedProvider::new();
        provider.request_single_fix(7, Accuracy::High, 20.0);

        assert_eq!(provider.single_fix_count(), 1);
        assert_eq!(provider.last_single_fix(), Some((7, Accuracy::High, 20.0)));
    }

    #[test]
    fn test_scripted_platform_state() {
        let provider = SimulatedProvider::new();
        assert!(provider.services_enabled());

        provider.set_services_enabled(false);
        provider.set_authorization_status(PlatformAuthStatus::Denied);

        assert!(!provider.services_enabled());
        assert_eq!(provider.authorization_status(), PlatformAuthStatus::Denied);
    }
}

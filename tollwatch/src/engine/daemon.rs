//! The engine task: owns all state, routes callbacks to events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{AuthorizationLevel, AuthorizationSlot, AuthorizationState, PlatformAuthStatus};
use crate::error::{classify_failure, LocationError};
use crate::events::{Event, EventSink};
use crate::gate::{DistanceGate, MovementClass};
use crate::position::{Position, PositionCache};
use crate::provider::{
    Accuracy, FixSource, LocationProvider, ObserveOptions, DEFAULT_DISTANCE_FILTER_M,
};
use crate::region::{
    parse_entered_ids, split_composite_id, GeofenceDescriptor, MonitoredRegion, RegionRegistry,
};
use crate::request::{OneShotState, PendingFix};
use crate::settings::Settings;

use super::handle::{EngineHandle, LocationStatus};
use super::{Command, ProviderEvent};

/// The geofence and location event engine.
///
/// Single owner of all engine state; see the module docs for the
/// surrounding architecture. Construct with [`LocationEngine::new`] and
/// drive with [`LocationEngine::run`].
pub struct LocationEngine {
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn EventSink>,
    settings: Settings,
    rx: mpsc::UnboundedReceiver<Command>,

    cache: PositionCache,
    gate: DistanceGate,
    registry: RegionRegistry,
    one_shot: OneShotState,
    auth: AuthorizationSlot,

    /// Whether continuous observation is active for the consumer.
    observing: bool,
    /// Options of the most recent observation start; reused when a
    /// geofence add restarts updates.
    observe_options: ObserveOptions,
    /// Last known coordinates, (0, 0) before the first fix.
    last_latitude: f64,
    last_longitude: f64,

    next_request_id: u64,
}

impl LocationEngine {
    /// Create the engine and its consumer handle.
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn EventSink>,
        settings: Settings,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            provider,
            sink,
            settings,
            rx,
            cache: PositionCache::new(),
            gate: DistanceGate::new(),
            registry: RegionRegistry::new(),
            one_shot: OneShotState::Idle,
            auth: AuthorizationSlot::new(),
            observing: false,
            observe_options: ObserveOptions::default(),
            last_latitude: 0.0,
            last_longitude: 0.0,
            next_request_id: 1,
        };
        (engine, EngineHandle::new(tx))
    }

    /// Process commands until cancellation or until every handle is gone.
    pub async fn run(mut self, shutdown: CancellationToken) {
        debug!("location engine started");
        loop {
            let deadline = self.one_shot.deadline();
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.handle_timeout();
                }
            }
        }
        debug!("location engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::RequestAuthorization { level, reply } => {
                self.request_authorization(level, reply)
            }
            Command::GetCurrentPosition { options, reply } => {
                self.get_current_position(options, reply)
            }
            Command::StartLocationUpdate { options } => {
                self.provider.start_updates(&options);
                self.observe_options = options;
                self.observing = true;
            }
            Command::StopLocationUpdate => {
                self.provider.stop_updates();
                self.observing = false;
            }
            Command::AddGeofence { descriptor } => self.add_geofence(&descriptor),
            Command::ResetGeofences { entered_csv } => self.reset_geofences(&entered_csv),
            Command::SetDistanceFilter { meters } => self.set_distance_filter(meters),
            Command::GetLocationStatus { reply } => {
                let _ = reply.send(self.location_status());
            }
            Command::OpenLocationSettings => self.provider.open_location_settings(),
            Command::StopAllMonitoring => {
                for region in self.registry.clear() {
                    self.provider.stop_monitoring(&region.composite_id);
                }
            }
            Command::Provider(event) => self.handle_provider_event(event),
        }
    }

    // ------------------------------------------------------------------
    // Consumer commands
    // ------------------------------------------------------------------

    fn request_authorization(
        &mut self,
        level: AuthorizationLevel,
        reply: tokio::sync::oneshot::Sender<AuthorizationState>,
    ) {
        if !self.provider.services_enabled() {
            let _ = reply.send(AuthorizationState::Disabled);
            return;
        }

        match self.provider.authorization_status() {
            PlatformAuthStatus::AuthorizedAlways | PlatformAuthStatus::AuthorizedWhenInUse => {
                let _ = reply.send(AuthorizationState::Granted);
            }
            PlatformAuthStatus::Denied => {
                let _ = reply.send(AuthorizationState::Denied);
            }
            PlatformAuthStatus::Restricted => {
                let _ = reply.send(AuthorizationState::Restricted);
            }
            PlatformAuthStatus::NotDetermined => {
                self.auth.park(reply);
                self.provider.request_authorization(level);
            }
        }
    }

    fn get_current_position(
        &mut self,
        options: crate::request::RequestOptions,
        reply: tokio::sync::oneshot::Sender<Result<Position, LocationError>>,
    ) {
        if let Some(cached) = self.cache.fresh(options.max_age) {
            let _ = reply.send(Ok(*cached));
            return;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let accuracy = if options.high_accuracy {
            Accuracy::High
        } else {
            Accuracy::Standard
        };
        let distance_filter = options
            .distance_filter_m
            .unwrap_or_else(|| self.settings.distance_filter());

        self.provider
            .request_single_fix(request_id, accuracy, distance_filter);

        let pending = PendingFix {
            request_id,
            reply,
            deadline: options.deadline_from_now(),
        };
        if let Some(displaced) = self.one_shot.arm(pending) {
            // The newer call owns the slot; detach the older session so a
            // late fix cannot resolve anything.
            self.provider.cancel_single_fix(displaced.request_id);
        }
    }

    fn add_geofence(&mut self, descriptor: &str) {
        let parsed = match GeofenceDescriptor::parse(descriptor) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(%err, descriptor, "dropping malformed geofence descriptor");
                return;
            }
        };

        let region = MonitoredRegion::from_descriptor(&parsed);
        if let Some(region) = self.registry.insert(region) {
            self.provider.start_monitoring(region);
            // Keep entry/exit notifications flowing even if the consumer
            // never started observation explicitly.
            self.provider.start_updates(&self.observe_options);
            let composite_id = region.composite_id.clone();
            debug!(
                composite_id = %composite_id,
                monitored = self.registry.len(),
                "geofence added"
            );
        }
    }

    fn reset_geofences(&mut self, entered_csv: &str) {
        let entered = parse_entered_ids(entered_csv);
        let removed = self.registry.retain_entered(&entered);
        for region in &removed {
            self.provider.stop_monitoring(&region.composite_id);
        }
        debug!(
            removed = removed.len(),
            remaining = self.registry.len(),
            "geofences reconciled against entered list"
        );
    }

    fn set_distance_filter(&mut self, meters: f64) {
        let effective = if meters == 0.0 {
            DEFAULT_DISTANCE_FILTER_M
        } else {
            meters
        };
        if let Err(err) = self.settings.set_distance_filter(effective) {
            warn!(%err, "failed to persist distance filter");
        }
        self.provider.set_distance_filter(effective);
    }

    fn location_status(&mut self) -> LocationStatus {
        let mut needs_prompt = false;
        match self.provider.authorization_status() {
            PlatformAuthStatus::AuthorizedAlways => {
                self.provider.start_significant_change_updates();
            }
            PlatformAuthStatus::AuthorizedWhenInUse => {
                needs_prompt = true;
            }
            PlatformAuthStatus::NotDetermined | PlatformAuthStatus::Denied => {
                self.provider
                    .request_authorization(AuthorizationLevel::Always);
                needs_prompt = true;
            }
            PlatformAuthStatus::Restricted => {}
        }

        LocationStatus {
            latitude: self.last_latitude,
            longitude: self.last_longitude,
            needs_prompt,
        }
    }

    // ------------------------------------------------------------------
    // Provider callbacks
    // ------------------------------------------------------------------

    fn handle_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::PositionUpdate { source, position } => {
                self.position_update(source, position)
            }
            ProviderEvent::PositionFailure { source, failure } => {
                self.position_failure(source, failure)
            }
            ProviderEvent::RegionEntered { composite_id } => {
                self.region_crossing(&composite_id, true)
            }
            ProviderEvent::RegionExited { composite_id } => {
                self.region_crossing(&composite_id, false)
            }
            ProviderEvent::AuthorizationChanged { status } => {
                self.auth.resolve(status);
            }
            ProviderEvent::MonitoringStarted { composite_id } => {
                debug!(
                    %composite_id,
                    monitored = self.registry.len(),
                    "region monitoring started"
                );
            }
            ProviderEvent::MonitoringFailed { composite_id } => {
                warn!(%composite_id, "region monitoring failed");
                self.sink.emit(Event::MonitorFailed { composite_id });
            }
        }
    }

    fn position_update(&mut self, source: FixSource, position: Position) {
        match source {
            FixSource::Continuous => {
                self.record_and_classify(position);
                if self.observing {
                    self.sink.emit(Event::GeolocationDidChange(position));
                }
            }
            FixSource::SingleFix { request_id } => {
                // A result from a timed-out or displaced session is
                // discarded entirely; its callback was detached.
                let Some(pending) = self.one_shot.complete(request_id) else {
                    debug!(request_id, "late single-fix result discarded");
                    return;
                };
                self.record_and_classify(position);
                let _ = pending.reply.send(Ok(position));
            }
        }
    }

    /// Update last-known position and the cache, then run the movement
    /// gate and emit the matching movement event.
    fn record_and_classify(&mut self, position: Position) {
        self.last_latitude = position.latitude;
        self.last_longitude = position.longitude;
        self.cache.store(position);

        match self.gate.classify(position.coordinate()) {
            MovementClass::MovedFar => self.sink.emit(Event::TollListRefresh {
                latitude: position.latitude,
                longitude: position.longitude,
            }),
            MovementClass::MovedNear => self.sink.emit(Event::LocationUpdate {
                latitude: position.latitude,
                longitude: position.longitude,
            }),
        }
    }

    fn position_failure(&mut self, source: FixSource, failure: crate::error::ProviderFailure) {
        let error = classify_failure(failure, self.provider.services_enabled());

        match source {
            FixSource::Continuous => {
                if self.observing {
                    self.sink.emit(Event::GeolocationError(error));
                } else {
                    debug!(%error, "continuous fix failure with no observer");
                }
            }
            FixSource::SingleFix { request_id } => {
                match self.one_shot.complete(request_id) {
                    Some(pending) => {
                        let _ = pending.reply.send(Err(error));
                    }
                    None => {
                        debug!(request_id, "late single-fix failure discarded");
                    }
                }
            }
        }
    }

    fn region_crossing(&mut self, composite_id: &str, entered: bool) {
        let Some((region_id, label)) = split_composite_id(composite_id) else {
            debug!(composite_id, "dropping malformed region id");
            return;
        };

        let event = if entered {
            Event::NearToll {
                latitude: self.last_latitude,
                longitude: self.last_longitude,
                region_id: region_id.to_string(),
                label: label.to_string(),
            }
        } else {
            Event::ExitedToll {
                latitude: self.last_latitude,
                longitude: self.last_longitude,
                region_id: region_id.to_string(),
                label: label.to_string(),
            }
        };
        self.sink.emit(event);
    }

    fn handle_timeout(&mut self) {
        if let Some(pending) = self.one_shot.expire() {
            debug!(
                request_id = pending.request_id,
                "one-shot position request timed out"
            );
            self.provider.cancel_single_fix(pending.request_id);
            let _ = pending.reply.send(Err(LocationError::Timeout));
        }
    }
}

/// Sleep until a deadline; pends forever when there is none.
///
/// The `None` arm is unreachable behind the select guard but keeps the
/// future total.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

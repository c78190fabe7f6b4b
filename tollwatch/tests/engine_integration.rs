//! Integration tests for the location engine.
//!
//! These tests drive the complete flow: consumer commands and simulated
//! provider callbacks in, named events and resolved continuations out.
//!
//! Run with: `cargo test --test engine_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use tollwatch::auth::PlatformAuthStatus;
use tollwatch::engine::LocationEngine;
use tollwatch::events::{ChannelSink, Event};
use tollwatch::provider::SimulatedProvider;
use tollwatch::settings::Settings;
use tollwatch::{
    AuthorizationLevel, AuthorizationState, EngineHandle, FixSource, LocationError, Position,
    ProviderCallbacks, RequestOptions, MAX_MONITORED_REGIONS,
};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    provider: Arc<SimulatedProvider>,
    handle: EngineHandle,
    callbacks: ProviderCallbacks,
    events: UnboundedReceiver<Event>,
    shutdown: CancellationToken,
    _settings_dir: tempfile::TempDir,
}

/// Spawn an engine wired to a simulated provider and a channel sink.
fn start_engine() -> Harness {
    let provider = Arc::new(SimulatedProvider::new());
    let (sink, events) = ChannelSink::new();
    let settings_dir = tempfile::TempDir::new().expect("tempdir");
    let settings = Settings::at(settings_dir.path().join("settings.ini"));

    let (engine, handle) = LocationEngine::new(provider.clone(), Arc::new(sink), settings);
    let shutdown = CancellationToken::new();
    tokio::spawn(engine.run(shutdown.clone()));

    let callbacks = handle.provider_callbacks();
    Harness {
        provider,
        handle,
        callbacks,
        events,
        shutdown,
        _settings_dir: settings_dir,
    }
}

/// Let the engine task drain its queue (paused-clock friendly).
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Drain every event currently buffered in the sink.
fn drain(events: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn descriptor(index: usize) -> String {
    format!("17.70{index}*83.30{index}*T{index}*Gate{index}*120")
}

// ============================================================================
// One-shot position requests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fresh_cache_makes_no_provider_call() {
    let h = start_engine();

    // A continuous update populates the cache.
    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(17.7, 83.3, 1_000));
    settle().await;

    let result = h
        .handle
        .get_current_position(RequestOptions {
            max_age: Some(Duration::from_secs(60)),
            ..Default::default()
        })
        .await
        .expect("cached position");

    assert_eq!(result.latitude, 17.7);
    assert_eq!(
        h.provider.single_fix_count(),
        0,
        "fresh cache must not trigger a provider request"
    );
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_default_max_age_always_accepts_cache() {
    let h = start_engine();

    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(17.7, 83.3, 1_000));
    settle().await;
    tokio::time::advance(Duration::from_secs(3_600)).await;

    // No maximum age set: even an hour-old fix is served from cache.
    let result = h
        .handle
        .get_current_position(RequestOptions::default())
        .await
        .expect("cached position");
    assert_eq!(result.latitude, 17.7);
    assert_eq!(h.provider.single_fix_count(), 0);
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_stale_cache_issues_single_fix_and_resolves() {
    let h = start_engine();

    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(10.0, 20.0, 1_000));
    settle().await;
    tokio::time::advance(Duration::from_secs(120)).await;

    let handle = h.handle.clone();
    let request = tokio::spawn(async move {
        handle
            .get_current_position(RequestOptions {
                max_age: Some(Duration::from_secs(60)),
                ..Default::default()
            })
            .await
    });
    settle().await;

    let (request_id, _, _) = h.provider.last_single_fix().expect("fix requested");
    h.callbacks.on_position_update(
        FixSource::SingleFix { request_id },
        Position::at(11.0, 21.0, 2_000),
    );

    let resolved = request.await.unwrap().expect("resolved fix");
    assert_eq!(resolved.latitude, 11.0);
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fires_exactly_once_and_late_result_is_noop() {
    let mut h = start_engine();
    let start = tokio::time::Instant::now();

    let result = h
        .handle
        .get_current_position(RequestOptions {
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        })
        .await;

    assert_eq!(result, Err(LocationError::Timeout));
    assert!(
        start.elapsed() >= Duration::from_secs(5),
        "timeout resolved early at {:?}",
        start.elapsed()
    );

    // The in-flight session was cancelled alongside the timeout.
    let (request_id, _, _) = h.provider.last_single_fix().expect("fix requested");
    assert_eq!(h.provider.cancelled_fixes(), vec![request_id]);

    // A late result from the dead session changes nothing.
    h.callbacks.on_position_update(
        FixSource::SingleFix { request_id },
        Position::at(50.0, 60.0, 9_000),
    );
    settle().await;
    assert!(
        drain(&mut h.events).is_empty(),
        "late result must not emit events"
    );

    let status = h.handle.get_location_status().await.unwrap();
    assert_eq!(
        (status.latitude, status.longitude),
        (0.0, 0.0),
        "late result must not update last-known position"
    );
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_single_fix_failure_resolves_error() {
    let mut h = start_engine();

    let handle = h.handle.clone();
    let request = tokio::spawn(async move {
        handle
            .get_current_position(RequestOptions {
                max_age: Some(Duration::from_secs(1)),
                ..Default::default()
            })
            .await
    });
    settle().await;

    let (request_id, _, _) = h.provider.last_single_fix().expect("fix requested");
    h.callbacks.on_position_failure(
        FixSource::SingleFix { request_id },
        tollwatch::ProviderFailure::Network,
    );

    let result = request.await.unwrap();
    assert_eq!(result.unwrap_err().code(), 2);
    assert!(drain(&mut h.events).is_empty(), "one-shot failures do not emit");
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_stop_observation_leaves_pending_one_shot_alive() {
    let mut h = start_engine();

    h.handle.start_location_update(Default::default());
    let handle = h.handle.clone();
    let request = tokio::spawn(async move {
        handle
            .get_current_position(RequestOptions {
                max_age: Some(Duration::from_secs(1)),
                ..Default::default()
            })
            .await
    });
    settle().await;
    h.handle.stop_location_update();
    settle().await;

    let (request_id, _, _) = h.provider.last_single_fix().expect("fix requested");
    h.callbacks.on_position_update(
        FixSource::SingleFix { request_id },
        Position::at(5.0, 6.0, 3_000),
    );

    let resolved = request.await.unwrap().expect("one-shot survives stop");
    assert_eq!(resolved.latitude, 5.0);
    drain(&mut h.events);
    h.shutdown.cancel();
}

// ============================================================================
// Movement gate and continuous observation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_movement_gate_near_then_far() {
    let mut h = start_engine();

    // First fix establishes the reference: near.
    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(0.0, 0.0, 1_000));
    // 0.01° of longitude at the equator is ~1.11 km: far.
    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(0.0, 0.01, 2_000));
    settle().await;

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), "locationUpdates");
    assert_eq!(events[1].name(), "callTOTollsList");
    assert_eq!(events[1].payload(), serde_json::json!([0.0, 0.01]));
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_observation_adds_full_position_event() {
    let mut h = start_engine();

    h.handle.start_location_update(Default::default());
    settle().await;
    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(17.7, 83.3, 1_000));
    settle().await;

    let events = drain(&mut h.events);
    let names: Vec<&str> = events.iter().map(Event::name).collect();
    assert_eq!(names, vec!["locationUpdates", "geolocationDidChange"]);
    assert_eq!(events[1].payload()["coords"]["latitude"], 17.7);
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_continuous_failure_emits_only_while_observing() {
    let mut h = start_engine();

    // Not observing: classified failure is swallowed.
    h.callbacks
        .on_position_failure(FixSource::Continuous, tollwatch::ProviderFailure::Network);
    settle().await;
    assert!(drain(&mut h.events).is_empty());

    h.handle.start_location_update(Default::default());
    settle().await;
    h.callbacks
        .on_position_failure(FixSource::Continuous, tollwatch::ProviderFailure::Network);
    settle().await;

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "geolocationError");
    assert_eq!(events[0].payload()["code"], 2);
    h.shutdown.cancel();
}

// ============================================================================
// Geofences
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_capacity_limits_monitored_regions_to_twenty() {
    let h = start_engine();

    for i in 0..21 {
        h.handle.add_geofence(&descriptor(i));
    }
    settle().await;

    assert_eq!(
        h.provider.monitoring_started().len(),
        MAX_MONITORED_REGIONS,
        "the 21st add must be a silent no-op"
    );
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_descriptor_leaves_monitored_set_unchanged() {
    let h = start_engine();

    h.handle.add_geofence("17.7*83.3*T1*MainGate"); // four fields
    h.handle.add_geofence("north*83.3*T1*MainGate*120"); // bad latitude
    h.handle.add_geofence(""); // empty
    settle().await;

    assert!(h.provider.monitoring_started().is_empty());
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_reset_keeps_only_entered_regions() {
    let h = start_engine();

    h.handle.add_geofence("17.701*83.301*A*GateA*100");
    h.handle.add_geofence("17.702*83.302*B*GateB*100");
    h.handle.add_geofence("17.703*83.303*C*GateC*100");
    settle().await;

    h.handle.reset_geofences("A****GateA,B****GateB");
    settle().await;

    assert_eq!(h.provider.monitoring_stopped(), vec!["C****GateC".to_string()]);
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_add_geofence_restarts_location_updates() {
    let h = start_engine();

    h.handle.add_geofence(&descriptor(1));
    settle().await;

    assert_eq!(h.provider.monitoring_started(), vec!["T1****Gate1".to_string()]);
    assert_eq!(
        h.provider.updates_started().len(),
        1,
        "adding a geofence keeps updates flowing"
    );
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_region_entry_event_carries_split_id_and_last_position() {
    let mut h = start_engine();

    h.callbacks
        .on_position_update(FixSource::Continuous, Position::at(17.7, 83.3, 1_000));
    settle().await;
    drain(&mut h.events);

    h.callbacks.on_region_entered("T1****MainGate");
    settle().await;

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "nearTOToll");
    assert_eq!(
        events[0].payload(),
        serde_json::json!([17.7, 83.3, "T1", "MainGate"])
    );
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_region_exit_and_malformed_ids() {
    let mut h = start_engine();

    h.callbacks.on_region_exited("T2****NorthGate");
    h.callbacks.on_region_exited("no-delimiter-here");
    settle().await;

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1, "malformed ids are dropped");
    assert_eq!(events[0].name(), "didExitFromToll");
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_monitoring_failure_emits_monitor_failed() {
    let mut h = start_engine();

    h.callbacks.on_region_monitoring_failed("T1****Gate1");
    settle().await;

    let events = drain(&mut h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "monitorFailed");
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_stop_all_monitoring_clears_every_region() {
    let h = start_engine();

    h.handle.add_geofence("17.701*83.301*A*GateA*100");
    h.handle.add_geofence("17.702*83.302*B*GateB*100");
    settle().await;
    h.handle.stop_all_monitoring();
    settle().await;

    let mut stopped = h.provider.monitoring_stopped();
    stopped.sort();
    assert_eq!(
        stopped,
        vec!["A****GateA".to_string(), "B****GateB".to_string()]
    );
    h.shutdown.cancel();
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_denied_platform_state_resolves_without_prompt() {
    let h = start_engine();
    h.provider
        .set_authorization_status(PlatformAuthStatus::Denied);

    let state = h
        .handle
        .request_authorization(AuthorizationLevel::WhenInUse)
        .await;

    assert_eq!(state, Some(AuthorizationState::Denied));
    assert!(h.provider.auth_prompts().is_empty(), "no prompt issued");
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_disabled_services_resolve_disabled() {
    let h = start_engine();
    h.provider.set_services_enabled(false);

    let state = h
        .handle
        .request_authorization(AuthorizationLevel::Always)
        .await;

    assert_eq!(state, Some(AuthorizationState::Disabled));
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_undetermined_waits_for_platform_answer() {
    let h = start_engine();
    h.provider
        .set_authorization_status(PlatformAuthStatus::NotDetermined);

    let handle = h.handle.clone();
    let request = tokio::spawn(async move {
        handle
            .request_authorization(AuthorizationLevel::WhenInUse)
            .await
    });
    settle().await;
    assert_eq!(
        h.provider.auth_prompts(),
        vec![AuthorizationLevel::WhenInUse]
    );

    // The user is still deciding: ignored.
    h.callbacks
        .on_authorization_changed(PlatformAuthStatus::NotDetermined);
    settle().await;
    assert!(!request.is_finished());

    h.callbacks
        .on_authorization_changed(PlatformAuthStatus::AuthorizedWhenInUse);
    let state = request.await.unwrap();
    assert_eq!(state, Some(AuthorizationState::Granted));
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_location_status_reflects_authorization() {
    let h = start_engine();

    // Granted always: switches to significant changes, no prompt needed.
    h.provider
        .set_authorization_status(PlatformAuthStatus::AuthorizedAlways);
    let status = h.handle.get_location_status().await.unwrap();
    assert!(!status.needs_prompt);
    assert_eq!(h.provider.significant_change_starts(), 1);

    // Denied: prompts for always and flags the popup.
    h.provider
        .set_authorization_status(PlatformAuthStatus::Denied);
    let status = h.handle.get_location_status().await.unwrap();
    assert!(status.needs_prompt);
    assert_eq!(h.provider.auth_prompts(), vec![AuthorizationLevel::Always]);
    h.shutdown.cancel();
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_set_distance_filter_persists_and_applies() {
    let h = start_engine();

    h.handle.set_distance_filter(35.0);
    settle().await;
    assert_eq!(h.provider.distance_filters(), vec![35.0]);

    // Zero means unset: the 20 m default is applied instead.
    h.handle.set_distance_filter(0.0);
    settle().await;
    assert_eq!(h.provider.distance_filters(), vec![35.0, 20.0]);
    h.shutdown.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_uses_persisted_distance_filter() {
    let h = start_engine();

    h.handle.set_distance_filter(42.0);
    settle().await;

    let handle = h.handle.clone();
    tokio::spawn(async move {
        let _ = handle
            .get_current_position(RequestOptions {
                max_age: Some(Duration::from_secs(1)),
                ..Default::default()
            })
            .await;
    });
    settle().await;

    let (_, _, filter) = h.provider.last_single_fix().expect("fix requested");
    assert_eq!(filter, 42.0);
    h.shutdown.cancel();
}

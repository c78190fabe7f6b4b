//! Replay a recorded trace through the engine.
//!
//! The trace is JSON lines, one record per line:
//!
//! ```text
//! {"type":"position","latitude":17.707,"longitude":83.300}
//! {"type":"enter","id":"T1****MainGate"}
//! {"type":"exit","id":"T1****MainGate"}
//! ```
//!
//! The geofence file holds one `lat*lon*id*label*radius` descriptor per
//! line. Every event the engine emits is printed to stdout as
//! `<name> <payload>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tollwatch::engine::LocationEngine;
use tollwatch::events::ChannelSink;
use tollwatch::provider::SimulatedProvider;
use tollwatch::settings::Settings;
use tollwatch::{FixSource, ObserveOptions, Position};

use super::CommandError;

#[derive(Args)]
pub struct ReplayArgs {
    /// Trace file (JSON lines).
    #[arg(long)]
    pub trace: PathBuf,

    /// Geofence descriptor file, one `lat*lon*id*label*radius` per line.
    #[arg(long)]
    pub geofences: Option<PathBuf>,

    /// Distance filter in meters for the observation session.
    #[arg(long, default_value_t = 20.0)]
    pub distance_filter: f64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TraceRecord {
    Position {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        timestamp_ms: i64,
    },
    Enter {
        id: String,
    },
    Exit {
        id: String,
    },
}

pub fn run(args: ReplayArgs) -> Result<(), CommandError> {
    let records = load_trace(&args.trace)?;
    let descriptors = match &args.geofences {
        Some(path) => std::fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CommandError::RuntimeCreation)?;

    runtime.block_on(replay(args, records, descriptors));
    Ok(())
}

fn load_trace(path: &Path) -> Result<Vec<TraceRecord>, CommandError> {
    std::fs::read_to_string(path)?
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| CommandError::Trace {
                line: index + 1,
                source,
            })
        })
        .collect()
}

async fn replay(args: ReplayArgs, records: Vec<TraceRecord>, descriptors: Vec<String>) {
    let provider = Arc::new(SimulatedProvider::new());
    let (sink, mut events) = ChannelSink::new();
    let (engine, handle) =
        LocationEngine::new(provider, Arc::new(sink), Settings::default_location());

    let shutdown = CancellationToken::new();
    let engine_task = tokio::spawn(engine.run(shutdown.clone()));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{} {}", event.name(), event.payload());
        }
    });

    for descriptor in &descriptors {
        handle.add_geofence(descriptor);
    }
    info!(geofences = descriptors.len(), "replay starting");

    handle.start_location_update(ObserveOptions {
        distance_filter_m: args.distance_filter,
        ..Default::default()
    });

    let callbacks = handle.provider_callbacks();
    for record in records {
        match record {
            TraceRecord::Position {
                latitude,
                longitude,
                timestamp_ms,
            } => {
                let position = if timestamp_ms == 0 {
                    Position::at_now(latitude, longitude)
                } else {
                    Position::at(latitude, longitude, timestamp_ms)
                };
                callbacks.on_position_update(FixSource::Continuous, position);
            }
            TraceRecord::Enter { id } => callbacks.on_region_entered(&id),
            TraceRecord::Exit { id } => callbacks.on_region_exited(&id),
        }
        // Let the engine interleave each record with its event output.
        tokio::task::yield_now().await;
    }

    // Let the engine finish any queued records before shutting down.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    drop(callbacks);
    drop(handle);
    shutdown.cancel();
    let _ = engine_task.await;
    let _ = printer.await;
}

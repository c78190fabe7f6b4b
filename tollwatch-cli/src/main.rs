//! Tollwatch CLI - replay location traces through the engine.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tollwatch", version, about = "Toll-plaza geofencing engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded trace and geofence file through the engine,
    /// printing every emitted event.
    Replay(commands::replay::ReplayArgs),

    /// Great-circle distance in meters between two points.
    Distance(commands::distance::DistanceArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Distance(args) => commands::distance::run(args),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

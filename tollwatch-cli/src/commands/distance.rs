//! Great-circle distance between two points.

use clap::Args;

use tollwatch::coord::{great_circle_distance_m, Coordinate};

use super::CommandError;

#[derive(Args)]
pub struct DistanceArgs {
    /// Latitude of the first point in degrees.
    pub lat1: f64,
    /// Longitude of the first point in degrees.
    pub lon1: f64,
    /// Latitude of the second point in degrees.
    pub lat2: f64,
    /// Longitude of the second point in degrees.
    pub lon2: f64,
}

pub fn run(args: DistanceArgs) -> Result<(), CommandError> {
    let a = Coordinate::new(args.lat1, args.lon1).map_err(CommandError::Coordinate)?;
    let b = Coordinate::new(args.lat2, args.lon2).map_err(CommandError::Coordinate)?;

    println!("{:.1}", great_circle_distance_m(a, b));
    Ok(())
}

//! Coordinate types and great-circle distance.
//!
//! Provides the validated geographic coordinate type shared by the movement
//! gate and the region registry, plus the haversine distance used to decide
//! whether the device has moved far enough to matter.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Errors that can occur when constructing a coordinate.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CoordError {
    /// Latitude outside [-90, 90] degrees.
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] degrees.
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// A geographic point in WGS84 degrees.
///
/// Construction through [`Coordinate::new`] validates the ranges; the
/// unchecked fields are public because the engine also carries through
/// provider-reported values it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// True when this is the (0, 0) origin point.
    ///
    /// Some providers report the origin when they have no fix yet; the
    /// movement gate treats such fixes as glitches rather than movement.
    #[inline]
    pub fn is_origin(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two points in meters.
///
/// Uses the haversine formulation, which is numerically stable for the
/// short distances this engine compares against its 1 km threshold.
#[inline]
pub fn great_circle_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude * PI / 180.0;
    let lat_b = b.latitude * PI / 180.0;
    let d_lat = (b.latitude - a.latitude) * PI / 180.0;
    let d_lon = (b.longitude - a.longitude) * PI / 180.0;

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

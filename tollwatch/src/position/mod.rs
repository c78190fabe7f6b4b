//! Position fixes and the most-recent-position cache.
//!
//! A [`Position`] is the full payload of a single provider fix. The
//! [`PositionCache`] holds the most recent one together with its capture
//! instant so a one-shot request can decide whether a new provider call is
//! needed at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;

use crate::coord::Coordinate;

/// A single resolved position fix.
///
/// Immutable once constructed. Produced by the provider collaborator and
/// held transiently by the cache and the movement gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters above sea level.
    pub altitude: f64,
    /// Horizontal accuracy radius in meters.
    pub horizontal_accuracy: f64,
    /// Vertical accuracy in meters.
    pub vertical_accuracy: f64,
    /// Heading in degrees from true north, negative when unknown.
    pub heading: f64,
    /// Ground speed in meters per second, negative when unknown.
    pub speed: f64,
    /// Capture time in epoch milliseconds.
    pub timestamp_ms: i64,
}

impl Position {
    /// Create a position with only coordinates, all auxiliary fields zeroed.
    ///
    /// Used by tests and the replay provider; real adapters fill in every
    /// field from the platform fix.
    pub fn at(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            horizontal_accuracy: 0.0,
            vertical_accuracy: 0.0,
            heading: -1.0,
            speed: -1.0,
            timestamp_ms,
        }
    }

    /// Create a position stamped with the current wall-clock time.
    pub fn at_now(latitude: f64, longitude: f64) -> Self {
        Self::at(latitude, longitude, chrono::Utc::now().timestamp_millis())
    }

    /// The geographic coordinate of this fix.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Serialize as the nested `{coords, timestamp}` payload the
    /// application layer consumes.
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "coords": {
                "latitude": self.latitude,
                "longitude": self.longitude,
                "altitude": self.altitude,
                "accuracy": self.horizontal_accuracy,
                "altitudeAccuracy": self.vertical_accuracy,
                "heading": self.heading,
                "speed": self.speed,
            },
            "timestamp": self.timestamp_ms,
        })
    }
}

/// Holds the most recent resolved position and its capture instant.
///
/// Replaced on every provider update; consulted (never mutated) by the
/// one-shot request path. The capture instant uses the tokio clock so
/// paused-time tests can control freshness deterministically.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    entry: Option<(Position, Instant)>,
}

impl PositionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached position, stamping the current instant.
    pub fn store(&mut self, position: Position) {
        self.entry = Some((position, Instant::now()));
    }

    /// The cached position, if any, regardless of age.
    pub fn get(&self) -> Option<&Position> {
        self.entry.as_ref().map(|(p, _)| p)
    }

    /// The cached position if it is younger than `max_age`.
    ///
    /// `None` max-age means unbounded: any cached position is fresh. This
    /// mirrors the request default, where an unset maximum age always
    /// accepts the cache.
    pub fn fresh(&self, max_age: Option<Duration>) -> Option<&Position> {
        let (position, captured_at) = self.entry.as_ref()?;
        match max_age {
            None => Some(position),
            Some(limit) if captured_at.elapsed() < limit => Some(position),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let p = Position {
            latitude: 17.71,
            longitude: 83.30,
            altitude: 12.0,
            horizontal_accuracy: 5.0,
            vertical_accuracy: 8.0,
            heading: 90.0,
            speed: 13.9,
            timestamp_ms: 1_700_000_000_000,
        };
        let payload = p.payload();
        assert_eq!(payload["coords"]["latitude"], 17.71);
        assert_eq!(payload["coords"]["accuracy"], 5.0);
        assert_eq!(payload["coords"]["altitudeAccuracy"], 8.0);
        assert_eq!(payload["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_at_now_stamps_wall_clock_time() {
        let p = Position::at_now(17.7, 83.3);
        assert!(p.timestamp_ms > 0);
    }

    #[test]
    fn test_empty_cache_is_never_fresh() {
        let cache = PositionCache::new();
        assert!(cache.fresh(None).is_none());
        assert!(cache.fresh(Some(Duration::from_secs(60))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_max_age_always_accepts_cache() {
        let mut cache = PositionCache::new();
        cache.store(Position::at(17.7, 83.3, 0));

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(cache.fresh(None).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ages_out() {
        let mut cache = PositionCache::new();
        cache.store(Position::at(17.7, 83.3, 0));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.fresh(Some(Duration::from_secs(60))).is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.fresh(Some(Duration::from_secs(60))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_replaces_previous_entry() {
        let mut cache = PositionCache::new();
        cache.store(Position::at(1.0, 1.0, 0));
        tokio::time::advance(Duration::from_secs(120)).await;
        cache.store(Position::at(2.0, 2.0, 1));

        let fresh = cache.fresh(Some(Duration::from_secs(60))).unwrap();
        assert_eq!(fresh.latitude, 2.0);
    }
}

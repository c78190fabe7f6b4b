//! Geofence descriptors and the monitored-region registry.
//!
//! Geofences arrive from the consumer as delimited descriptor strings:
//! `{lat}*{lon}*{id}*{label}*{radius}`, e.g.
//! `17.7072867*83.3000947*T1*MainGate*120`. A parsed descriptor becomes a
//! [`MonitoredRegion`] identified by its composite id `{id}****{label}`,
//! which is the only identity used for later entry/exit correlation.
//!
//! The registry enforces a hard capacity of [`MAX_MONITORED_REGIONS`]:
//! once full, new regions are silently not added until capacity is freed
//! through reconciliation. Malformed external input is dropped, never
//! partially applied.

use std::collections::HashMap;

use thiserror::Error;

use crate::coord::Coordinate;

/// Hard ceiling on simultaneously monitored regions.
///
/// Matches the platform region-monitoring limit; requests beyond it are
/// no-ops rather than evictions.
pub const MAX_MONITORED_REGIONS: usize = 20;

/// Field separator inside a geofence descriptor string.
pub const DESCRIPTOR_DELIMITER: char = '*';

/// Separator joining region id and label into the composite id.
///
/// Four asterisks cannot collide with the single-asterisk descriptor
/// fields, so the composite id survives round-trips through the platform.
pub const COMPOSITE_ID_DELIMITER: &str = "****";

/// Error parsing a geofence descriptor.
///
/// Never surfaced to the consumer; descriptors come from untrusted
/// external strings and failures are dropped with a debug log.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptorError {
    /// Fewer than five delimited fields.
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    /// Latitude field did not parse as a number.
    #[error("invalid latitude field: {0}")]
    InvalidLatitude(String),
    /// Longitude field did not parse as a number.
    #[error("invalid longitude field: {0}")]
    InvalidLongitude(String),
    /// Radius field did not parse as a number.
    #[error("invalid radius field: {0}")]
    InvalidRadius(String),
}

/// A parsed geofence descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceDescriptor {
    /// Center latitude in degrees.
    pub latitude: f64,
    /// Center longitude in degrees.
    pub longitude: f64,
    /// Consumer-assigned region id.
    pub region_id: String,
    /// Human-readable label (toll plaza name).
    pub label: String,
    /// Radius in meters.
    pub radius_m: f64,
}

impl GeofenceDescriptor {
    /// Parse a `lat*lon*id*label*radius` descriptor string.
    ///
    /// Exactly the first five fields are used; any parse failure rejects
    /// the whole descriptor.
    pub fn parse(input: &str) -> Result<Self, DescriptorError> {
        let fields: Vec<&str> = input.split(DESCRIPTOR_DELIMITER).collect();
        if fields.len() < 5 {
            return Err(DescriptorError::FieldCount(fields.len()));
        }

        let latitude: f64 = fields[0]
            .trim()
            .parse()
            .map_err(|_| DescriptorError::InvalidLatitude(fields[0].to_string()))?;
        let longitude: f64 = fields[1]
            .trim()
            .parse()
            .map_err(|_| DescriptorError::InvalidLongitude(fields[1].to_string()))?;
        let radius_m: f64 = fields[4]
            .trim()
            .parse()
            .map_err(|_| DescriptorError::InvalidRadius(fields[4].to_string()))?;

        Ok(Self {
            latitude,
            longitude,
            region_id: fields[2].to_string(),
            label: fields[3].to_string(),
            radius_m,
        })
    }

    /// Composite identity used for platform monitoring and correlation.
    pub fn composite_id(&self) -> String {
        format!(
            "{}{}{}",
            self.region_id, COMPOSITE_ID_DELIMITER, self.label
        )
    }
}

/// Split a composite id back into `(region_id, label)`.
///
/// Returns `None` when the id does not contain the delimiter; malformed
/// ids from the platform are dropped by callers rather than propagated.
pub fn split_composite_id(composite_id: &str) -> Option<(&str, &str)> {
    composite_id.split_once(COMPOSITE_ID_DELIMITER)
}

/// A circular region under platform monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredRegion {
    /// Composite identity `{id}****{label}`.
    pub composite_id: String,
    /// Region center.
    pub center: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
    /// Notify when the device enters the region.
    pub notify_on_entry: bool,
    /// Notify when the device exits the region.
    pub notify_on_exit: bool,
}

impl MonitoredRegion {
    /// Build a monitored region from a parsed descriptor.
    ///
    /// Entry and exit notifications are always enabled; the consumer
    /// decides relevance downstream.
    pub fn from_descriptor(descriptor: &GeofenceDescriptor) -> Self {
        Self {
            composite_id: descriptor.composite_id(),
            center: Coordinate {
                latitude: descriptor.latitude,
                longitude: descriptor.longitude,
            },
            radius_m: descriptor.radius_m,
            notify_on_entry: true,
            notify_on_exit: true,
        }
    }
}

/// The set of regions currently monitored, keyed by composite id.
///
/// Owned exclusively by the engine task; capacity is a hard ceiling, not
/// a sliding window.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: HashMap<String, MonitoredRegion>,
}

impl RegionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regions currently monitored.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when no regions are monitored.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// True when the registry is at capacity.
    pub fn at_capacity(&self) -> bool {
        self.regions.len() >= MAX_MONITORED_REGIONS
    }

    /// True when a region with this composite id is monitored.
    pub fn contains(&self, composite_id: &str) -> bool {
        self.regions.contains_key(composite_id)
    }

    /// Composite ids of every monitored region.
    pub fn composite_ids(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    /// Insert a region unless the registry is at capacity.
    ///
    /// Returns the inserted region on success; `None` on overflow, which
    /// is a silent no-op at the API boundary. Re-inserting an existing
    /// composite id replaces that entry without counting against capacity.
    pub fn insert(&mut self, region: MonitoredRegion) -> Option<&MonitoredRegion> {
        if !self.regions.contains_key(&region.composite_id) && self.at_capacity() {
            tracing::debug!(
                composite_id = %region.composite_id,
                capacity = MAX_MONITORED_REGIONS,
                "region registry at capacity, dropping add"
            );
            return None;
        }
        let id = region.composite_id.clone();
        self.regions.insert(id.clone(), region);
        self.regions.get(&id)
    }

    /// Remove a region, returning it if it was monitored.
    pub fn remove(&mut self, composite_id: &str) -> Option<MonitoredRegion> {
        self.regions.remove(composite_id)
    }

    /// Drop every region whose composite id is not in `entered_ids`.
    ///
    /// Returns the removed regions so the caller can stop platform
    /// monitoring for each. Regions in the list are left untouched.
    pub fn retain_entered(&mut self, entered_ids: &[String]) -> Vec<MonitoredRegion> {
        let stale: Vec<String> = self
            .regions
            .keys()
            .filter(|id| !entered_ids.iter().any(|kept| kept == *id))
            .cloned()
            .collect();

        stale
            .into_iter()
            .filter_map(|id| self.regions.remove(&id))
            .collect()
    }

    /// Remove and return every monitored region.
    pub fn clear(&mut self) -> Vec<MonitoredRegion> {
        self.regions.drain().map(|(_, region)| region).collect()
    }
}

/// Parse a comma-separated list of composite ids into owned strings.
///
/// Empty segments are skipped, matching the forgiving treatment of the
/// consumer-supplied entered list.
pub fn parse_entered_ids(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

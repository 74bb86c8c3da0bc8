//! Region-specific defaults (spec §4.5). Latitude/longitude extents
//! are not enumerated by the spec; the bounding boxes below are a
//! reasonable real-world footprint for the two named regions, wide
//! enough that the PSO search is never artificially starved. See
//! DESIGN.md for the Open Question this resolves.

/// Clustering, search-space and distance-gating defaults for one
/// associator deployment region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    pub name: String,
    pub dbscan_epsilon_seconds: f64,
    pub dbscan_minimum_cluster_size: usize,
    pub latitude_min: f64,
    pub latitude_max: f64,
    pub longitude_min: f64,
    pub longitude_max: f64,
    pub depth_min_meters: f64,
    pub depth_max_meters: f64,
    pub maximum_distance_to_associate_km: f64,
}

impl RegionConfig {
    /// University of Utah Seismograph Stations network footprint.
    pub fn utah() -> Self {
        Self {
            name: "Utah".to_string(),
            dbscan_epsilon_seconds: 0.25,
            dbscan_minimum_cluster_size: 7,
            latitude_min: 36.0,
            latitude_max: 42.5,
            longitude_min: -114.5,
            longitude_max: -108.5,
            depth_min_meters: -1700.0,
            depth_max_meters: 22_000.0,
            maximum_distance_to_associate_km: 150.0,
        }
    }

    /// Yellowstone Volcano Observatory network footprint.
    pub fn yellowstone() -> Self {
        Self {
            name: "YNP".to_string(),
            dbscan_epsilon_seconds: 0.2,
            dbscan_minimum_cluster_size: 7,
            latitude_min: 44.0,
            latitude_max: 45.3,
            longitude_min: -111.4,
            longitude_max: -109.6,
            depth_min_meters: -1000.0,
            depth_max_meters: 16_000.0,
            maximum_distance_to_associate_km: 150.0,
        }
    }

    pub fn reference_depth_meters(&self) -> f64 {
        (self.depth_min_meters + self.depth_max_meters) / 2.0
    }
}

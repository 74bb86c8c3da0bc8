//! Station coordinate lookup used to turn a candidate hypocenter into
//! per-pick epicentral distances during PSO residual evaluation.

use std::collections::HashMap;

use urts_types::ChannelId;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two lat/lon points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// A static mapping from channel to (latitude, longitude) in degrees.
/// Station metadata is specified as an external collaborator (spec
/// §1 Non-goals: AQMS database access); this is the in-memory form
/// the associator consumes once that metadata has been resolved.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    locations: HashMap<ChannelId, (f64, f64)>,
}

impl StationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, channel: ChannelId, latitude: f64, longitude: f64) {
        self.locations.insert(channel, (latitude, longitude));
    }

    pub fn location(&self, channel: &ChannelId) -> Option<(f64, f64)> {
        self.locations.get(channel).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

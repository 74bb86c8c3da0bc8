//! Association workflow (spec §4.5): turns a batch of picks into zero
//! or more origins plus the picks left unassociated.

use std::sync::atomic::{AtomicU64, Ordering};

use urts_types::wire::{AssociationPick, AssociationReturnCode};
use urts_types::{Arrival, ChannelId, MicroTime, Origin, Phase, PhaseHint, Pick};

use crate::corrections::CorrectionTable;
use crate::dbscan::cluster_1d;
use crate::error::AssociatorError;
use crate::pso::{self, Observation, PsoConfig};
use crate::region::RegionConfig;
use crate::stations::{haversine_km, StationCatalog};
use crate::travel_time::TravelTimeModel;

/// A resolved pick: the wire projection plus everything the location
/// search needs that isn't carried on the wire (station position,
/// parsed channel, parsed phase).
struct ResolvedPick {
    wire: AssociationPick,
    channel: ChannelId,
    phase: Phase,
    station_latitude: f64,
    station_longitude: f64,
    time_seconds: f64,
}

pub struct AssociatorService {
    region: RegionConfig,
    stations: StationCatalog,
    model: Box<dyn TravelTimeModel>,
    corrections: CorrectionTable,
    pso_config: PsoConfig,
    next_origin_id: AtomicU64,
}

impl AssociatorService {
    pub fn new(
        region: RegionConfig,
        stations: StationCatalog,
        model: Box<dyn TravelTimeModel>,
        corrections: CorrectionTable,
    ) -> Self {
        Self {
            region,
            stations,
            model,
            corrections,
            pso_config: PsoConfig::default(),
            next_origin_id: AtomicU64::new(1),
        }
    }

    pub fn with_pso_config(mut self, pso_config: PsoConfig) -> Self {
        self.pso_config = pso_config;
        self
    }

    /// Runs the full association workflow against one batch of picks,
    /// returning the return code, the origins formed, and the picks
    /// that could not be associated with any of them.
    pub fn associate(
        &self,
        picks: &[AssociationPick],
        seed: u64,
    ) -> Result<(AssociationReturnCode, Vec<Origin>, Vec<AssociationPick>), AssociatorError> {
        if picks.is_empty() {
            return Err(AssociatorError::EmptyRequest);
        }

        let mut resolved = Vec::with_capacity(picks.len());
        let mut unresolved: Vec<AssociationPick> = Vec::new();
        for pick in picks {
            let channel = pick
                .channel_id()
                .map_err(|e| AssociatorError::MalformedChannel(e.to_string()))?;
            match self.stations.location(&channel) {
                Some((lat, lon)) => resolved.push(ResolvedPick {
                    phase: parse_phase(pick),
                    station_latitude: lat,
                    station_longitude: lon,
                    time_seconds: MicroTime::from_micros(pick.time).as_seconds(),
                    channel,
                    wire: pick.clone(),
                }),
                None => unresolved.push(pick.clone()),
            }
        }

        if resolved.is_empty() {
            return Err(AssociatorError::NoKnownStations);
        }

        let reference_depth_km = self.region.reference_depth_meters() / 1000.0;
        let origin_time_estimates: Vec<f64> = resolved
            .iter()
            .map(|r| {
                let correction = self.corrections.correction_for(&r.channel, r.phase);
                r.time_seconds
                    - self.model.travel_time_seconds(r.phase, 0.0, reference_depth_km)
                    - correction
            })
            .collect();

        let labels = cluster_1d(
            &origin_time_estimates,
            self.region.dbscan_epsilon_seconds,
            self.region.dbscan_minimum_cluster_size,
        );

        let cluster_count = labels.iter().filter_map(|l| *l).max().map_or(0, |m| m + 1);
        let mut origins = Vec::new();
        let mut unassociated: Vec<AssociationPick> = unresolved;

        for (i, label) in labels.iter().enumerate() {
            if label.is_none() {
                unassociated.push(resolved[i].wire.clone());
            }
        }

        for cluster_id in 0..cluster_count {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, l)| **l == Some(cluster_id))
                .map(|(i, _)| i)
                .collect();

            let observations: Vec<Observation> = members
                .iter()
                .map(|&i| Observation {
                    channel: resolved[i].channel.clone(),
                    phase: resolved[i].phase,
                    station_latitude: resolved[i].station_latitude,
                    station_longitude: resolved[i].station_longitude,
                    observed_time_seconds: resolved[i].time_seconds,
                })
                .collect();

            let Some((hypocenter, _fitness)) = pso::locate(
                &observations,
                &self.region,
                self.model.as_ref(),
                &self.corrections,
                &self.pso_config,
                seed.wrapping_add(cluster_id as u64),
            ) else {
                for &i in &members {
                    unassociated.push(resolved[i].wire.clone());
                }
                continue;
            };

            let mut accepted = Vec::new();
            for &i in &members {
                let distance_km = haversine_km(
                    hypocenter.latitude,
                    hypocenter.longitude,
                    resolved[i].station_latitude,
                    resolved[i].station_longitude,
                );
                if distance_km <= self.region.maximum_distance_to_associate_km {
                    accepted.push(i);
                } else {
                    unassociated.push(resolved[i].wire.clone());
                }
            }

            if accepted.len() < self.region.dbscan_minimum_cluster_size {
                for &i in &accepted {
                    unassociated.push(resolved[i].wire.clone());
                }
                continue;
            }

            let identifier = self.next_origin_id.fetch_add(1, Ordering::Relaxed);
            let mut origin = Origin::new(
                MicroTime::from_seconds(hypocenter.origin_time_seconds),
                hypocenter.latitude,
                hypocenter.longitude,
                hypocenter.depth_meters,
                identifier,
            )
            .map_err(|e| AssociatorError::InvalidHypocenter(e.to_string()))?;
            origin.algorithms.push("dbscan+pso".to_string());

            for &i in &accepted {
                let r = &resolved[i];
                let mut pick = Pick::new(r.channel.clone(), MicroTime::from_seconds(r.time_seconds), identifier);
                pick.phase_hint = Some(match r.phase {
                    Phase::P => PhaseHint::P,
                    Phase::S => PhaseHint::S,
                });
                let mut arrival = Arrival::new(pick, r.phase);
                let distance_km = haversine_km(
                    hypocenter.latitude,
                    hypocenter.longitude,
                    r.station_latitude,
                    r.station_longitude,
                );
                let travel_time = self
                    .model
                    .travel_time_seconds(r.phase, distance_km, hypocenter.depth_meters / 1000.0);
                arrival.travel_time_seconds = Some(travel_time);
                arrival.residual_seconds = Some(
                    r.time_seconds - (hypocenter.origin_time_seconds + travel_time),
                );
                origin.add_arrival(arrival);
            }
            origin.set_identifier(identifier);
            origins.push(origin);
        }

        Ok((AssociationReturnCode::Success, origins, unassociated))
    }
}

fn parse_phase(pick: &AssociationPick) -> Phase {
    match pick.phase_hint.as_deref() {
        Some("S") => Phase::S,
        _ => Phase::P,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel_time::ConstantVelocityModel;

    fn catalog() -> StationCatalog {
        let mut stations = StationCatalog::new();
        stations.insert(ChannelId::new("UU", "A", "HHZ", "01"), 40.3, -111.7);
        stations.insert(ChannelId::new("UU", "B", "HHZ", "01"), 40.1, -111.6);
        stations.insert(ChannelId::new("UU", "C", "HHZ", "01"), 40.25, -111.9);
        stations.insert(ChannelId::new("UU", "D", "HHZ", "01"), 40.0, -111.75);
        stations.insert(ChannelId::new("UU", "E", "HHZ", "01"), 40.35, -111.5);
        stations.insert(ChannelId::new("UU", "F", "HHZ", "01"), 40.15, -111.8);
        stations.insert(ChannelId::new("UU", "G", "HHZ", "01"), 40.28, -111.65);
        stations
    }

    fn service() -> AssociatorService {
        AssociatorService::new(
            RegionConfig::utah(),
            catalog(),
            Box::new(ConstantVelocityModel::continental_crust()),
            CorrectionTable::empty(),
        )
    }

    fn pick_at(station: &str, time_micros: i64) -> AssociationPick {
        AssociationPick {
            channel: format!("UU.{station}.HHZ.01"),
            time: time_micros,
            phase_hint: Some("P".to_string()),
            standard_error_seconds: 0.05,
            identifier: 1,
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        let svc = service();
        assert_eq!(svc.associate(&[], 1), Err(AssociatorError::EmptyRequest));
    }

    #[test]
    fn unknown_stations_only_is_rejected() {
        let svc = service();
        let picks = vec![AssociationPick {
            channel: "XX.ZZZ.HHZ.01".to_string(),
            time: 1_000_000,
            phase_hint: Some("P".to_string()),
            standard_error_seconds: 0.05,
            identifier: 1,
        }];
        assert_eq!(svc.associate(&picks, 1), Err(AssociatorError::NoKnownStations));
    }

    #[test]
    fn tight_cluster_of_coincident_picks_forms_one_origin() {
        let svc = service();
        let model = ConstantVelocityModel::continental_crust();
        let true_lat = 40.2;
        let true_lon = -111.72;
        let true_depth_km = 8.0;
        let true_origin = 1_000.0;

        let stations = [
            ("A", 40.3, -111.7),
            ("B", 40.1, -111.6),
            ("C", 40.25, -111.9),
            ("D", 40.0, -111.75),
            ("E", 40.35, -111.5),
            ("F", 40.15, -111.8),
            ("G", 40.28, -111.65),
        ];
        let picks: Vec<AssociationPick> = stations
            .iter()
            .map(|(name, lat, lon)| {
                let distance_km = haversine_km(true_lat, true_lon, *lat, *lon);
                let tt = model.travel_time_seconds(Phase::P, distance_km, true_depth_km);
                let time_seconds = true_origin + tt;
                pick_at(name, MicroTime::from_seconds(time_seconds).as_micros())
            })
            .collect();

        let (code, origins, unassociated) = svc.associate(&picks, 99).unwrap();
        assert_eq!(code, AssociationReturnCode::Success);
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0].arrivals.len(), 7);
        assert!(unassociated.is_empty());
        for arrival in &origins[0].arrivals {
            assert_eq!(arrival.origin_identifier, Some(origins[0].identifier));
        }
    }

    #[test]
    fn lone_pick_with_no_cluster_partners_is_unassociated() {
        let svc = service();
        let picks = vec![pick_at("A", 1_000_000)];
        let (code, origins, unassociated) = svc.associate(&picks, 1).unwrap();
        assert_eq!(code, AssociationReturnCode::Success);
        assert!(origins.is_empty());
        assert_eq!(unassociated.len(), 1);
    }
}

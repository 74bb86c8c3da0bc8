//! Particle-swarm hypocenter search (spec §4.5 step 3): given a
//! cluster of picks, finds the (latitude, longitude, depth) that
//! minimizes travel-time residuals against a reference model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::corrections::CorrectionTable;
use crate::region::RegionConfig;
use crate::stations::haversine_km;
use crate::travel_time::TravelTimeModel;
use urts_types::{ChannelId, Phase};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsoConfig {
    pub particle_count: usize,
    pub epoch_count: usize,
    pub inertia: f64,
    pub cognitive: f64,
    pub social: f64,
    /// Order of the norm used to combine residuals into a single
    /// fitness value; 2.0 is least-squares, 1.0 is least-absolute.
    pub lp_norm: f64,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            particle_count: 60,
            epoch_count: 20,
            inertia: 0.7,
            cognitive: 1.5,
            social: 1.5,
            lp_norm: 2.0,
        }
    }
}

/// One arrival contributing a residual term to the fitness function.
#[derive(Debug, Clone)]
pub struct Observation {
    pub channel: ChannelId,
    pub phase: Phase,
    pub station_latitude: f64,
    pub station_longitude: f64,
    pub observed_time_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypocenter {
    pub latitude: f64,
    pub longitude: f64,
    pub depth_meters: f64,
    pub origin_time_seconds: f64,
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: [f64; 3],
    velocity: [f64; 3],
    best_position: [f64; 3],
    best_fitness: f64,
}

/// Runs a bounded particle swarm over (latitude, longitude, depth)
/// and returns the best hypocenter found, alongside its fitness
/// residual. The swarm's own origin time at each candidate position
/// is the median residual-adjusted observation time, not a searched
/// dimension, matching the spec's separation of location search from
/// the arrival-time linear term.
pub fn locate(
    observations: &[Observation],
    region: &RegionConfig,
    model: &dyn TravelTimeModel,
    corrections: &CorrectionTable,
    config: &PsoConfig,
    seed: u64,
) -> Option<(Hypocenter, f64)> {
    if observations.is_empty() {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let depth_min_km = region.depth_min_meters / 1000.0;
    let depth_max_km = region.depth_max_meters / 1000.0;

    let mut particles: Vec<Particle> = (0..config.particle_count)
        .map(|_| {
            let position = [
                rng.gen_range(region.latitude_min..=region.latitude_max),
                rng.gen_range(region.longitude_min..=region.longitude_max),
                rng.gen_range(depth_min_km..=depth_max_km),
            ];
            Particle {
                position,
                velocity: [0.0, 0.0, 0.0],
                best_position: position,
                best_fitness: f64::INFINITY,
            }
        })
        .collect();

    let mut global_best_position = particles[0].position;
    let mut global_best_fitness = f64::INFINITY;

    for particle in particles.iter_mut() {
        let fitness = fitness_of(particle.position, observations, model, corrections, config.lp_norm);
        particle.best_fitness = fitness;
        if fitness < global_best_fitness {
            global_best_fitness = fitness;
            global_best_position = particle.position;
        }
    }

    for _epoch in 0..config.epoch_count {
        for particle in particles.iter_mut() {
            for dim in 0..3 {
                let r_cognitive: f64 = rng.gen_range(0.0..1.0);
                let r_social: f64 = rng.gen_range(0.0..1.0);
                particle.velocity[dim] = config.inertia * particle.velocity[dim]
                    + config.cognitive * r_cognitive * (particle.best_position[dim] - particle.position[dim])
                    + config.social * r_social * (global_best_position[dim] - particle.position[dim]);
                particle.position[dim] += particle.velocity[dim];
            }
            particle.position[0] = particle.position[0].clamp(region.latitude_min, region.latitude_max);
            particle.position[1] = particle.position[1].clamp(region.longitude_min, region.longitude_max);
            particle.position[2] = particle.position[2].clamp(depth_min_km, depth_max_km);

            let fitness = fitness_of(particle.position, observations, model, corrections, config.lp_norm);
            if fitness < particle.best_fitness {
                particle.best_fitness = fitness;
                particle.best_position = particle.position;
            }
            if fitness < global_best_fitness {
                global_best_fitness = fitness;
                global_best_position = particle.position;
            }
        }
    }

    let origin_time_seconds = origin_time_for(global_best_position, observations, model, corrections);
    Some((
        Hypocenter {
            latitude: global_best_position[0],
            longitude: global_best_position[1],
            depth_meters: global_best_position[2] * 1000.0,
            origin_time_seconds,
        },
        global_best_fitness,
    ))
}

fn residuals(
    position: [f64; 3],
    observations: &[Observation],
    model: &dyn TravelTimeModel,
    corrections: &CorrectionTable,
    origin_time_seconds: f64,
) -> Vec<f64> {
    observations
        .iter()
        .map(|obs| {
            let distance_km = haversine_km(position[0], position[1], obs.station_latitude, obs.station_longitude);
            let predicted_travel_time = model.travel_time_seconds(obs.phase, distance_km, position[2]);
            let correction = corrections.correction_for(&obs.channel, obs.phase);
            let predicted_time = origin_time_seconds + predicted_travel_time + correction;
            obs.observed_time_seconds - predicted_time
        })
        .collect()
}

fn origin_time_for(
    position: [f64; 3],
    observations: &[Observation],
    model: &dyn TravelTimeModel,
    corrections: &CorrectionTable,
) -> f64 {
    let mut candidates: Vec<f64> = observations
        .iter()
        .map(|obs| {
            let distance_km = haversine_km(position[0], position[1], obs.station_latitude, obs.station_longitude);
            let predicted_travel_time = model.travel_time_seconds(obs.phase, distance_km, position[2]);
            let correction = corrections.correction_for(&obs.channel, obs.phase);
            obs.observed_time_seconds - predicted_travel_time - correction
        })
        .collect();
    candidates.sort_by(|a, b| a.partial_cmp(b).expect("travel times are never NaN"));
    candidates[candidates.len() / 2]
}

fn fitness_of(
    position: [f64; 3],
    observations: &[Observation],
    model: &dyn TravelTimeModel,
    corrections: &CorrectionTable,
    lp_norm: f64,
) -> f64 {
    let origin_time_seconds = origin_time_for(position, observations, model, corrections);
    let residuals = residuals(position, observations, model, corrections, origin_time_seconds);
    let sum: f64 = residuals.iter().map(|r| r.abs().powf(lp_norm)).sum();
    sum.powf(1.0 / lp_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel_time::ConstantVelocityModel;

    fn observation(channel: &str, lat: f64, lon: f64, observed_time: f64) -> Observation {
        Observation {
            channel: ChannelId::new("UU", channel, "HHZ", "01"),
            phase: Phase::P,
            station_latitude: lat,
            station_longitude: lon,
            observed_time_seconds: observed_time,
        }
    }

    #[test]
    fn locates_a_hypocenter_near_the_true_source() {
        let model = ConstantVelocityModel::continental_crust();
        let region = RegionConfig::utah();
        let true_lat = 40.2;
        let true_lon = -111.7;
        let true_depth_km = 8.0;
        let true_origin_time = 1_000.0;

        let stations = [
            ("A", 40.3, -111.7),
            ("B", 40.1, -111.6),
            ("C", 40.25, -111.9),
            ("D", 40.0, -111.75),
            ("E", 40.35, -111.5),
        ];
        let observations: Vec<Observation> = stations
            .iter()
            .map(|(name, lat, lon)| {
                let distance_km = haversine_km(true_lat, true_lon, *lat, *lon);
                let tt = model.travel_time_seconds(Phase::P, distance_km, true_depth_km);
                observation(name, *lat, *lon, true_origin_time + tt)
            })
            .collect();

        let corrections = CorrectionTable::empty();
        let config = PsoConfig::default();
        let (hypocenter, fitness) =
            locate(&observations, &region, &model, &corrections, &config, 42).expect("non-empty swarm");

        assert!(fitness < 1.0, "residual fitness too large: {fitness}");
        assert!((hypocenter.latitude - true_lat).abs() < 0.5);
        assert!((hypocenter.longitude - true_lon).abs() < 0.5);
    }

    #[test]
    fn empty_observations_yield_no_hypocenter() {
        let model = ConstantVelocityModel::continental_crust();
        let region = RegionConfig::utah();
        let corrections = CorrectionTable::empty();
        let config = PsoConfig::default();
        assert!(locate(&[], &region, &model, &corrections, &config, 1).is_none());
    }

    #[test]
    fn same_seed_is_deterministic() {
        let model = ConstantVelocityModel::continental_crust();
        let region = RegionConfig::utah();
        let corrections = CorrectionTable::empty();
        let config = PsoConfig::default();
        let observations = vec![
            observation("A", 40.3, -111.7, 1000.5),
            observation("B", 40.1, -111.6, 1000.8),
            observation("C", 40.25, -111.9, 1000.3),
        ];

        let first = locate(&observations, &region, &model, &corrections, &config, 7).unwrap();
        let second = locate(&observations, &region, &model, &corrections, &config, 7).unwrap();
        assert_eq!(first.0.latitude, second.0.latitude);
        assert_eq!(first.0.longitude, second.0.longitude);
        assert_eq!(first.1, second.1);
    }
}

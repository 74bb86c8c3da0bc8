//! Pick-to-origin association (spec §4.5): clusters pick origin-time
//! estimates with DBSCAN, then refines a hypocenter per cluster with a
//! particle swarm search over a region-bounded travel-time model.

pub mod corrections;
pub mod dbscan;
pub mod error;
pub mod pso;
pub mod region;
pub mod service;
pub mod stations;
pub mod travel_time;
pub mod worker;

pub use corrections::{CorrectionEntry, CorrectionTable};
pub use error::AssociatorError;
pub use pso::{Hypocenter, Observation, PsoConfig};
pub use region::RegionConfig;
pub use service::AssociatorService;
pub use stations::StationCatalog;
pub use travel_time::{ConstantVelocityModel, TravelTimeModel};
pub use worker::AssociatorWorker;

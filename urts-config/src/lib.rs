//! Typed configuration objects for every configurable surface named in
//! spec §6. Construction is always programmatic; no INI file parsing
//! or `--ini=`/`--instance=` CLI handling is implemented here — those
//! are the concern of a module entry point built on top of this core.

pub mod associator;
pub mod broadcast;
pub mod error;
pub mod general;
pub mod service;
pub mod threshold;

pub use associator::AssociatorConfig;
pub use broadcast::BroadcastConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use service::ServiceConfig;
pub use threshold::ThresholdDetectorConfig;

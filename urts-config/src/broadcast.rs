use std::time::Duration;

use crate::error::ConfigError;

/// One publish/subscribe broadcast endpoint (spec §6 per-broadcast keys).
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastConfig {
    pub broadcast_name: String,
    pub broadcast_address: String,
    pub high_water_mark: u32,
    pub time_out: Duration,
}

impl BroadcastConfig {
    pub fn new(
        broadcast_name: impl Into<String>,
        broadcast_address: impl Into<String>,
    ) -> Self {
        Self {
            broadcast_name: broadcast_name.into(),
            broadcast_address: broadcast_address.into(),
            high_water_mark: 1_000,
            time_out: Duration::from_millis(10),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_name.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "Broadcast.broadcastName",
            });
        }
        if self.broadcast_address.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "Broadcast.broadcastAddress",
            });
        }
        if self.high_water_mark == 0 {
            return Err(ConfigError::NotPositive {
                field: "Broadcast.highWaterMark",
                value: 0.0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_high_water_mark_is_rejected() {
        let mut config = BroadcastConfig::new("packets", "tcp://127.0.0.1:5555");
        config.high_water_mark = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_validate() {
        let config = BroadcastConfig::new("packets", "tcp://127.0.0.1:5555");
        assert!(config.validate().is_ok());
    }
}

use std::time::Duration;

use crate::error::ConfigError;

/// One request/reply service endpoint (spec §6 per-service keys).
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub service_name: String,
    pub service_address: String,
    pub polling_time_out: Duration,
    pub receive_high_water_mark: u32,
    pub send_high_water_mark: u32,
}

impl ServiceConfig {
    pub fn new(service_name: impl Into<String>, service_address: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_address: service_address.into(),
            polling_time_out: Duration::from_millis(10),
            receive_high_water_mark: 1_000,
            send_high_water_mark: 1_000,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "Service.serviceName",
            });
        }
        if self.service_address.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "Service.serviceAddress",
            });
        }
        if self.polling_time_out.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "Service.pollingTimeOut",
                value: 0.0,
            });
        }
        Ok(())
    }
}

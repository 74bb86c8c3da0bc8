use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be set")]
    MissingValue { field: &'static str },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{low_field} ({low}) must not exceed {high_field} ({high})")]
    OutOfOrder {
        low_field: &'static str,
        low: f64,
        high_field: &'static str,
        high: f64,
    },
}

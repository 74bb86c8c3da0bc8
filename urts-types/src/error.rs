use thiserror::Error;

/// Construction/validation failures for the core data model.
///
/// These are configuration-adjacent errors in the sense of spec §7 kind 1:
/// they are raised synchronously at the point a value is built, never
/// thrown across a thread boundary.
#[derive(Debug, Error, PartialEq)]
pub enum TypesError {
    #[error("latitude {0} out of range [-90, 90]")]
    InvalidLatitude(f64),

    #[error("depth {0} out of range [-8900, 800000] meters")]
    InvalidDepth(f64),

    #[error("sampling rate {0} must be strictly positive")]
    InvalidSamplingRate(f64),

    #[error("uncertainty bound invariant violated: lower percentile {lower_percentile} must be <= upper percentile {upper_percentile}, and lower perturbation {lower_perturbation} must be <= upper perturbation {upper_perturbation}")]
    InvalidUncertaintyBounds {
        lower_percentile: f64,
        upper_percentile: f64,
        lower_perturbation: i64,
        upper_perturbation: i64,
    },

    #[error("percentile {0} out of range [0, 100]")]
    InvalidPercentile(f64),
}

/// Wire (de)serialization failures, spec §7 kind 3 (message-validity errors).
#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode message as CBOR: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("failed to decode message from CBOR: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("unexpected message type: expected {expected}, got {actual}")]
    UnexpectedMessageType { expected: String, actual: String },

    #[error("unsupported message version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

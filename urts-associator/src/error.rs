use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AssociatorError {
    #[error("association request carried no picks")]
    EmptyRequest,
    #[error("pick channel identifier is malformed: {0}")]
    MalformedChannel(String),
    #[error("no station coordinates are known for any pick in this request")]
    NoKnownStations,
    #[error("located hypocenter is not a valid origin: {0}")]
    InvalidHypocenter(String),
}

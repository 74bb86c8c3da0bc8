use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PickerError {
    #[error("packet cache query returned a gapped window, cannot refine pick")]
    GappedWindow,
    #[error("pick time is within the perturbation tolerance of the query window edge")]
    TooCloseToWindowEdge,
    #[error("inference request failed: {0}")]
    InferenceFailure(String),
}

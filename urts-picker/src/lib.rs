//! Picker pipeline (spec §4.4): per-channel orchestration of packet
//! cache queries, waveform interpolation, inference requests and
//! first-motion classification, run on a dedicated worker thread.

pub mod error;
pub mod inference;
pub mod pipeline;
pub mod worker;

pub use error::PickerError;
pub use inference::{InferenceClient, InferenceSegment, NullInferenceClient, RefinementResult};
pub use pipeline::{PickerChannel, PickerChannelConfig};
pub use worker::PickerWorker;

//! The pick-regression and first-motion services are external
//! collaborators (spec §1 Non-goals: "the ML inference models
//! themselves"). This module only specifies the request/response
//! contract the picker pipeline drives.

use urts_types::{ChannelId, FirstMotion, MicroTime, UncertaintyBounds};

use crate::error::PickerError;

/// Sub-sample correction and uncertainty returned by a successful
/// regression request (spec §4.4 step 4).
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementResult {
    pub corrected_time: MicroTime,
    pub uncertainty: UncertaintyBounds,
}

/// A cut waveform segment handed to the inference service: the model
/// consumes a fixed-length window centered on the initial pick.
pub struct InferenceSegment<'a> {
    pub channel: &'a ChannelId,
    pub sampling_rate_hz: f64,
    pub segment_start: MicroTime,
    pub samples: &'a [f64],
    pub initial_pick_time: MicroTime,
}

/// The regression and first-motion services the picker pipeline calls
/// out to. Implementations typically wrap a request/reply transport
/// client; [`NullInferenceClient`] is a test double that always fails
/// softly, exercising the pipeline's fallback paths.
pub trait InferenceClient: Send + Sync {
    fn refine(&self, segment: &InferenceSegment<'_>) -> Result<RefinementResult, PickerError>;

    fn classify_first_motion(
        &self,
        segment: &InferenceSegment<'_>,
    ) -> Result<FirstMotion, PickerError>;
}

/// Test double: every request fails, as if the inference service were
/// unreachable. Exercises the "algorithm failed" tagging and
/// first-motion-left-unknown fallback paths without a real model.
pub struct NullInferenceClient;

impl InferenceClient for NullInferenceClient {
    fn refine(&self, _segment: &InferenceSegment<'_>) -> Result<RefinementResult, PickerError> {
        Err(PickerError::InferenceFailure(
            "no inference service configured".to_string(),
        ))
    }

    fn classify_first_motion(
        &self,
        _segment: &InferenceSegment<'_>,
    ) -> Result<FirstMotion, PickerError> {
        Err(PickerError::InferenceFailure(
            "no inference service configured".to_string(),
        ))
    }
}

//! Per-channel picker pipeline (spec §4.4): query the packet cache,
//! interpolate a window centered on an initial pick, cut a
//! fixed-length segment, run inference, and produce a refined pick.

use std::sync::Arc;

use urts_cache::CacheHandle;
use urts_interpolator::WaveformInterpolator;
use urts_types::{ChannelId, DataPacket, MicroTime, Packet, Phase, Pick};

use crate::error::PickerError;
use crate::inference::{InferenceClient, InferenceSegment};

/// Configuration for one channel's picker pipeline (spec §4.4: "a
/// cached inference-request template pre-populated with channel
/// identifiers, and a pick template").
#[derive(Debug, Clone)]
pub struct PickerChannelConfig {
    pub phase: Phase,
    pub pre_window_seconds: f64,
    pub post_window_seconds: f64,
    /// Allowable sub-sample perturbation the model may return; also
    /// used as the edge-proximity rejection tolerance.
    pub perturbation_tolerance_seconds: f64,
    pub segment_length_samples: usize,
}

impl PickerChannelConfig {
    fn pad_seconds(&self) -> f64 {
        self.perturbation_tolerance_seconds
    }
}

/// Drives one channel's packet cache, interpolator and inference
/// client through the query → interpolate → cut → infer →
/// first-motion sequence.
pub struct PickerChannel {
    channel: ChannelId,
    config: PickerChannelConfig,
    cache: CacheHandle<DataPacket>,
    interpolator: WaveformInterpolator,
    inference: Arc<dyn InferenceClient>,
}

impl PickerChannel {
    pub fn new(
        channel: ChannelId,
        config: PickerChannelConfig,
        cache: CacheHandle<DataPacket>,
        interpolator: WaveformInterpolator,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            channel,
            config,
            cache,
            interpolator,
            inference,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Runs the full pipeline on an initial pick from the threshold
    /// extractor, returning a refined pick. Every failing step is
    /// logged and falls back per spec §4.4: a failed regression keeps
    /// the initial time with an `"algorithm failed"` tag; a failed
    /// first-motion call simply leaves the motion as unknown.
    pub fn process(&self, initial: Pick) -> Pick {
        let mut refined = initial.clone();

        let segment = match self.query_interpolate_cut(&initial) {
            Ok(segment) => segment,
            Err(error) => {
                tracing::warn!(channel = %self.channel, %error, "picker pipeline could not build an inference window");
                refined.tag_algorithm("algorithm failed");
                return refined;
            }
        };
        let view = InferenceSegment {
            channel: &self.channel,
            sampling_rate_hz: segment.sampling_rate_hz,
            segment_start: segment.segment_start,
            samples: &segment.samples,
            initial_pick_time: segment.initial_pick_time,
        };

        match self.inference.refine(&view) {
            Ok(result) => {
                refined.time = result.corrected_time;
                refined.uncertainty = Some(result.uncertainty);
            }
            Err(error) => {
                tracing::warn!(channel = %self.channel, %error, "regression request failed");
                refined.tag_algorithm("algorithm failed");
            }
        }

        if self.config.phase == Phase::P {
            match self.inference.classify_first_motion(&view) {
                Ok(first_motion) => refined.first_motion = first_motion,
                Err(error) => {
                    tracing::debug!(channel = %self.channel, %error, "first-motion request failed, leaving unknown");
                }
            }
        }

        refined
    }

    fn query_interpolate_cut(&self, pick: &Pick) -> Result<InferenceSegmentOwned, PickerError> {
        let pad = self.config.pad_seconds();
        let pre = self.config.pre_window_seconds + pad;
        let post = self.config.post_window_seconds + pad;

        let query_start = pick.time - (pre * 1_000_000.0).round() as i64;
        let query_end = pick.time + (post * 1_000_000.0).round() as i64;

        let packets = self.cache.lock().query(query_start, query_end);

        let result = self
            .interpolator
            .interpolate(&packets, query_start, query_end);
        if result.has_gaps {
            return Err(PickerError::GappedWindow);
        }

        // `result.start_time`/`result.end_time` always echo back the
        // queried `[query_start, query_end]` bounds, so they cannot
        // reveal a window whose *real* packet coverage falls short of
        // what was requested (the interpolator's gap tolerance allows
        // up to `gap_tolerance_micros` of slack at each edge without
        // flagging `has_gaps`). Measure the edge distance against the
        // actual first/last covering packet instead.
        let actual_start = packets
            .first()
            .map(Packet::start_time)
            .unwrap_or(query_end);
        let actual_end = packets
            .last()
            .and_then(Packet::end_time)
            .unwrap_or(query_start);

        let start_tolerance_micros = (pre * 1_000_000.0).round() as i64;
        let end_tolerance_micros = (post * 1_000_000.0).round() as i64;
        let distance_to_start = pick.time.as_micros() - actual_start.as_micros();
        let distance_to_end = actual_end.as_micros() - pick.time.as_micros();
        if distance_to_start < start_tolerance_micros || distance_to_end < end_tolerance_micros {
            return Err(PickerError::TooCloseToWindowEdge);
        }

        let (segment_start, samples) = cut_segment(
            &result.samples,
            self.interpolator.nominal_sampling_rate_hz(),
            result.start_time,
            pick.time,
            self.config.segment_length_samples,
        );

        Ok(InferenceSegmentOwned {
            sampling_rate_hz: self.interpolator.nominal_sampling_rate_hz(),
            segment_start,
            samples,
            initial_pick_time: pick.time,
        })
    }
}

/// Owned form of [`InferenceSegment`]; borrowed when handed to the
/// inference client.
struct InferenceSegmentOwned {
    sampling_rate_hz: f64,
    segment_start: MicroTime,
    samples: Vec<f64>,
    initial_pick_time: MicroTime,
}

/// Cuts a fixed-length window from `samples` centered on `pick_time`,
/// clamping at the edges of the interpolated window rather than
/// panicking on a too-short buffer.
fn cut_segment(
    samples: &[f64],
    sampling_rate_hz: f64,
    window_start: MicroTime,
    pick_time: MicroTime,
    length: usize,
) -> (MicroTime, Vec<f64>) {
    if samples.is_empty() || length == 0 {
        return (window_start, Vec::new());
    }
    let period_us = 1_000_000.0 / sampling_rate_hz;
    let center_index = ((pick_time.as_micros() - window_start.as_micros()) as f64 / period_us)
        .round() as i64;
    let half = (length / 2) as i64;
    let mut start = center_index - half;
    let mut end = start + length as i64;

    if start < 0 {
        end -= start;
        start = 0;
    }
    if end > samples.len() as i64 {
        let overshoot = end - samples.len() as i64;
        start = (start - overshoot).max(0);
        end = samples.len() as i64;
    }

    let segment_start = window_start + (start as f64 * period_us).round() as i64;
    (segment_start, samples[start as usize..end as usize].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::NullInferenceClient;
    use parking_lot::Mutex;
    use urts_cache::CircularPacketCache;

    fn ch() -> ChannelId {
        ChannelId::new("UU", "ABC", "HHZ", "01")
    }

    fn channel_with_packet(samples: Vec<f64>, start_us: i64) -> PickerChannel {
        let cache = Arc::new(Mutex::new(CircularPacketCache::new(16).unwrap()));
        let packet =
            DataPacket::new(ch(), 100.0, MicroTime::from_micros(start_us), samples).unwrap();
        cache.lock().add(packet);
        let interpolator = WaveformInterpolator::new(100.0, 1_000).unwrap();
        PickerChannel::new(
            ch(),
            PickerChannelConfig {
                phase: Phase::P,
                pre_window_seconds: 1.0,
                post_window_seconds: 1.0,
                perturbation_tolerance_seconds: 0.1,
                segment_length_samples: 32,
            },
            cache,
            interpolator,
            Arc::new(NullInferenceClient),
        )
    }

    #[test]
    fn missing_coverage_falls_back_to_initial_pick_with_tag() {
        let pipeline = channel_with_packet(vec![0.0; 50], 0);
        let pick = Pick::new(ch(), MicroTime::from_micros(1_000_000), 1);
        let refined = pipeline.process(pick.clone());
        assert_eq!(refined.time, pick.time);
        assert_eq!(
            refined.processing_algorithms,
            Some(vec!["algorithm failed".to_string()])
        );
    }

    #[test]
    fn inference_failure_keeps_initial_time_but_tags_failure() {
        // Plenty of continuous coverage around the pick.
        let pipeline = channel_with_packet(vec![0.0; 400], 0);
        let pick = Pick::new(ch(), MicroTime::from_micros(2_000_000), 1);
        let refined = pipeline.process(pick.clone());
        assert_eq!(refined.time, pick.time);
        assert_eq!(refined.first_motion, urts_types::FirstMotion::Unknown);
        assert_eq!(
            refined.processing_algorithms,
            Some(vec!["algorithm failed".to_string()])
        );
    }

    #[test]
    fn coverage_short_of_pre_window_is_rejected_even_without_a_flagged_gap() {
        // gap tolerance is 1_000us; the packet starts 900us after the
        // query's lower bound, so `has_gaps` does not fire, but real
        // coverage still falls short of `pre_window + perturbation`.
        let cache = Arc::new(Mutex::new(CircularPacketCache::new(16).unwrap()));
        let packet = DataPacket::new(
            ch(),
            100.0,
            MicroTime::from_micros(900_900),
            vec![0.0; 300],
        )
        .unwrap();
        cache.lock().add(packet);
        let interpolator = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let pipeline = PickerChannel::new(
            ch(),
            PickerChannelConfig {
                phase: Phase::P,
                pre_window_seconds: 1.0,
                post_window_seconds: 1.0,
                perturbation_tolerance_seconds: 0.1,
                segment_length_samples: 32,
            },
            cache,
            interpolator,
            Arc::new(NullInferenceClient),
        );

        let pick = Pick::new(ch(), MicroTime::from_micros(2_000_000), 1);
        let refined = pipeline.process(pick.clone());
        assert_eq!(refined.time, pick.time);
        assert_eq!(
            refined.processing_algorithms,
            Some(vec!["algorithm failed".to_string()])
        );
    }

    #[test]
    fn cut_segment_clamps_at_buffer_edges() {
        let samples: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (start, cut) = cut_segment(
            &samples,
            100.0,
            MicroTime::from_micros(0),
            MicroTime::from_micros(0),
            8,
        );
        assert_eq!(cut.len(), 8);
        assert_eq!(start, MicroTime::from_micros(0));
    }
}

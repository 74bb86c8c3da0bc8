//! Gap-detecting resampler producing continuous single/three-component
//! windows over `[t0, t1]` (spec §4.2).

use thiserror::Error;
use urts_types::{MicroTime, Packet};

#[derive(Debug, Error, PartialEq)]
pub enum InterpolatorError {
    #[error("nominal sampling rate must be strictly positive, got {0}")]
    InvalidSamplingRate(f64),
    #[error("gap tolerance must be non-negative, got {0}")]
    InvalidGapTolerance(i64),
}

/// Converts a gap budget expressed in samples into a microsecond
/// tolerance, per spec §4.2: `floor((gap_samples - 1) / Fs)`.
pub fn gap_tolerance_from_samples(gap_samples: u32, sampling_rate_hz: f64) -> i64 {
    if gap_samples == 0 {
        return 0;
    }
    (((gap_samples - 1) as f64 / sampling_rate_hz) * 1_000_000.0).floor() as i64
}

/// Result of resampling a window. `has_gaps` must be checked by the
/// caller before trusting `samples`: per spec §4.2 the caller must
/// discard the result when gaps are detected.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationResult {
    pub start_time: MicroTime,
    pub end_time: MicroTime,
    pub has_gaps: bool,
    pub samples: Vec<f64>,
}

impl InterpolationResult {
    fn rejected(t0: MicroTime, t1: MicroTime) -> Self {
        InterpolationResult {
            start_time: t0,
            end_time: t1,
            has_gaps: true,
            samples: Vec::new(),
        }
    }
}

/// Three-component window produced once vertical/north/east all
/// independently satisfy the requested window (spec §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct ThreeComponentWindow {
    pub start_time: MicroTime,
    pub end_time: MicroTime,
    pub vertical: Vec<f64>,
    pub north: Vec<f64>,
    pub east: Vec<f64>,
}

/// Stateless resampler configured for one nominal sampling rate and
/// gap tolerance.
#[derive(Debug, Clone, Copy)]
pub struct WaveformInterpolator {
    nominal_sampling_rate_hz: f64,
    gap_tolerance_micros: i64,
}

impl WaveformInterpolator {
    pub fn new(
        nominal_sampling_rate_hz: f64,
        gap_tolerance_micros: i64,
    ) -> Result<Self, InterpolatorError> {
        if nominal_sampling_rate_hz <= 0.0 {
            return Err(InterpolatorError::InvalidSamplingRate(
                nominal_sampling_rate_hz,
            ));
        }
        if gap_tolerance_micros < 0 {
            return Err(InterpolatorError::InvalidGapTolerance(gap_tolerance_micros));
        }
        Ok(Self {
            nominal_sampling_rate_hz,
            gap_tolerance_micros,
        })
    }

    pub fn nominal_sampling_rate_hz(&self) -> f64 {
        self.nominal_sampling_rate_hz
    }

    /// True if the packets (assumed pre-sorted by start time, as
    /// returned by [`urts_cache::CircularPacketCache::query`]) fail to
    /// continuously cover `[t0, t1]` within the configured tolerance.
    fn has_gaps<P: Packet>(&self, packets: &[P], t0: MicroTime, t1: MicroTime) -> bool {
        let Some(first) = packets.first() else {
            return true;
        };
        if first.start_time().as_micros() - t0.as_micros() > self.gap_tolerance_micros {
            return true;
        }

        let mut prev_end = match first.end_time() {
            Some(end) => end,
            None => return true,
        };

        for packet in packets.iter().skip(1) {
            let gap = packet.start_time().as_micros() - prev_end.as_micros();
            if gap > self.gap_tolerance_micros {
                return true;
            }
            prev_end = match packet.end_time() {
                Some(end) => end,
                None => return true,
            };
        }

        t1.as_micros() - prev_end.as_micros() > self.gap_tolerance_micros
    }

    fn flatten<P: Packet>(packets: &[P]) -> Vec<(f64, f64)> {
        let mut combined = Vec::new();
        for packet in packets {
            let period_us = packet.period_micros();
            let start_us = packet.start_time().as_micros() as f64;
            for (i, &value) in packet.samples().iter().enumerate() {
                combined.push((start_us + i as f64 * period_us, value));
            }
        }
        combined
    }

    fn sample_at(combined: &[(f64, f64)], t: f64) -> f64 {
        let idx = combined.partition_point(|&(tt, _)| tt < t);
        if idx == 0 {
            return combined[0].1;
        }
        if idx >= combined.len() {
            return combined[combined.len() - 1].1;
        }
        let (t0, v0) = combined[idx - 1];
        let (t1, v1) = combined[idx];
        if (t1 - t0).abs() < f64::EPSILON {
            return v0;
        }
        let frac = (t - t0) / (t1 - t0);
        v0 + frac * (v1 - v0)
    }

    /// Produces a dense vector at the configured nominal sampling rate
    /// over `[t0, t1]`. Callers must check `has_gaps` before using
    /// `samples`.
    pub fn interpolate<P: Packet>(
        &self,
        packets: &[P],
        t0: MicroTime,
        t1: MicroTime,
    ) -> InterpolationResult {
        if self.has_gaps(packets, t0, t1) {
            tracing::debug!(
                t0 = t0.as_micros(),
                t1 = t1.as_micros(),
                "interpolation window has gaps, rejecting"
            );
            return InterpolationResult::rejected(t0, t1);
        }

        let combined = Self::flatten(packets);
        let step_us = 1_000_000.0 / self.nominal_sampling_rate_hz;
        let span_us = (t1.as_micros() - t0.as_micros()) as f64;
        let n_samples = (span_us / step_us).floor() as i64 + 1;

        let mut samples = Vec::with_capacity(n_samples.max(0) as usize);
        let start_us = t0.as_micros() as f64;
        for k in 0..n_samples.max(0) {
            let t = start_us + k as f64 * step_us;
            samples.push(Self::sample_at(&combined, t));
        }

        let end_time = t0 + ((n_samples.max(1) - 1) as f64 * step_us).round() as i64;

        InterpolationResult {
            start_time: t0,
            end_time,
            has_gaps: false,
            samples,
        }
    }

    /// Three-component variant: rejects the whole window unless
    /// vertical, north and east all independently satisfy it (spec
    /// §4.2).
    pub fn interpolate_three_component<P: Packet>(
        &self,
        vertical: &[P],
        north: &[P],
        east: &[P],
        t0: MicroTime,
        t1: MicroTime,
    ) -> Option<ThreeComponentWindow> {
        let v = self.interpolate(vertical, t0, t1);
        if v.has_gaps {
            return None;
        }
        let n = self.interpolate(north, t0, t1);
        if n.has_gaps {
            return None;
        }
        let e = self.interpolate(east, t0, t1);
        if e.has_gaps {
            return None;
        }
        Some(ThreeComponentWindow {
            start_time: v.start_time,
            end_time: v.end_time,
            vertical: v.samples,
            north: n.samples,
            east: e.samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urts_types::{ChannelId, DataPacket};

    fn ch() -> ChannelId {
        ChannelId::new("UU", "ABC", "HHZ", "01")
    }

    fn packet(start_us: i64, n: usize, rate: f64, value: f64) -> DataPacket {
        DataPacket::new(
            ch(),
            rate,
            MicroTime::from_micros(start_us),
            vec![value; n],
        )
        .unwrap()
    }

    #[test]
    fn gap_tolerance_matches_formula() {
        // 5 sample gap budget at 100 Hz -> floor(4/100 * 1e6) = 40_000us
        assert_eq!(gap_tolerance_from_samples(5, 100.0), 40_000);
        assert_eq!(gap_tolerance_from_samples(0, 100.0), 0);
    }

    #[test]
    fn continuous_packets_interpolate_without_gaps() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        // Two contiguous 1-second packets at 100Hz covering [0, 2s).
        let p1 = packet(0, 100, 100.0, 1.0);
        let p2 = packet(1_000_000, 100, 100.0, 2.0);
        let result = interp.interpolate(
            &[p1, p2],
            MicroTime::from_micros(0),
            MicroTime::from_micros(1_990_000),
        );
        assert!(!result.has_gaps);
        assert!(!result.samples.is_empty());
        // First half should be close to 1.0, second half close to 2.0.
        assert!((result.samples[0] - 1.0).abs() < 1e-6);
        assert!((result.samples.last().unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn large_boundary_gap_is_flagged() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let p1 = packet(0, 100, 100.0, 1.0);
        // Gap of 500ms between packets, far beyond tolerance.
        let p2 = packet(1_500_000, 100, 100.0, 2.0);
        let result = interp.interpolate(
            &[p1, p2],
            MicroTime::from_micros(0),
            MicroTime::from_micros(1_990_000),
        );
        assert!(result.has_gaps);
        assert!(result.samples.is_empty());
    }

    #[test]
    fn missing_coverage_at_edges_is_a_gap() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let p1 = packet(100_000, 100, 100.0, 1.0);
        // Window starts before the first packet by more than tolerance.
        let result = interp.interpolate(
            &[p1],
            MicroTime::from_micros(0),
            MicroTime::from_micros(500_000),
        );
        assert!(result.has_gaps);
    }

    #[test]
    fn empty_packet_list_is_a_gap() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let result = interp.interpolate(
            &Vec::<DataPacket>::new(),
            MicroTime::from_micros(0),
            MicroTime::from_micros(500_000),
        );
        assert!(result.has_gaps);
    }

    #[test]
    fn three_component_rejects_when_one_channel_has_gaps() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let full = vec![packet(0, 300, 100.0, 1.0)];
        let gapped = vec![packet(0, 50, 100.0, 1.0), packet(900_000, 50, 100.0, 1.0)];
        let result = interp.interpolate_three_component(
            &full,
            &full,
            &gapped,
            MicroTime::from_micros(0),
            MicroTime::from_micros(990_000),
        );
        assert!(result.is_none());
    }

    #[test]
    fn three_component_succeeds_when_all_channels_are_continuous() {
        let interp = WaveformInterpolator::new(100.0, 1_000).unwrap();
        let z = vec![packet(0, 300, 100.0, 1.0)];
        let n = vec![packet(0, 300, 100.0, 2.0)];
        let e = vec![packet(0, 300, 100.0, 3.0)];
        let result = interp
            .interpolate_three_component(
                &z,
                &n,
                &e,
                MicroTime::from_micros(0),
                MicroTime::from_micros(990_000),
            )
            .unwrap();
        assert_eq!(result.vertical.len(), result.north.len());
        assert_eq!(result.north.len(), result.east.len());
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(WaveformInterpolator::new(0.0, 0).is_err());
        assert!(WaveformInterpolator::new(100.0, -1).is_err());
    }
}

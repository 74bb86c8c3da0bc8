//! Streaming threshold-based pick extractor (spec §4.3).
//!
//! States: `Off` (awaiting trigger-on) and `On` (inside a trigger
//! window). The extractor is fed one probability packet at a time and
//! tracks enough state (`last_evaluation_time`, the in-progress
//! trigger) to stay consistent across packet boundaries, including
//! out-of-order or gapped delivery.

use thiserror::Error;
use urts_types::{MicroTime, Packet, Phase, SamplePoint, TriggerWindow};

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("minimum_gap_size must be at least 1 sample")]
    InvalidMinimumGapSize,
    #[error("max_trigger_duration must be positive if set")]
    InvalidMaxTriggerDuration,
}

/// Configuration for one threshold detector instance (spec §4.3
/// table). A deployment runs one instance per phase (P, S), sharing
/// this implementation — see [`ThresholdExtractor::phase`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub on_threshold: f64,
    pub off_threshold: f64,
    pub minimum_gap_size: u32,
    pub max_trigger_duration_micros: Option<i64>,
}

impl ThresholdConfig {
    pub fn new(on_threshold: f64, off_threshold: f64) -> Self {
        Self {
            on_threshold,
            off_threshold,
            minimum_gap_size: 5,
            max_trigger_duration_micros: Some(10_000_000),
        }
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.minimum_gap_size == 0 {
            return Err(ThresholdError::InvalidMinimumGapSize);
        }
        if matches!(self.max_trigger_duration_micros, Some(d) if d <= 0) {
            return Err(ThresholdError::InvalidMaxTriggerDuration);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractorState {
    Off,
    On,
}

#[derive(Debug, Clone, Copy)]
struct PartialTrigger {
    start: SamplePoint,
    max: SamplePoint,
}

/// Rounds a sample index's time to the nearest microsecond, per spec
/// §4.3 ("sample times... rounded to the nearest microsecond before
/// any comparison, to avoid drift between adjacent packets").
fn sample_time(packet_start: MicroTime, index: usize, period_micros: f64) -> MicroTime {
    let micros = packet_start.as_micros() as f64 + index as f64 * period_micros;
    MicroTime::from_micros(micros.round() as i64)
}

/// The streaming state machine itself. One instance tracks one
/// channel's probability stream for one phase.
pub struct ThresholdExtractor {
    config: ThresholdConfig,
    phase: Phase,
    state: ExtractorState,
    current_trigger: Option<PartialTrigger>,
    last_evaluation_time: Option<MicroTime>,
}

impl ThresholdExtractor {
    pub fn new(config: ThresholdConfig, phase: Phase) -> Result<Self, ThresholdError> {
        config.validate()?;
        Ok(Self {
            config,
            phase,
            state: ExtractorState::Off,
            current_trigger: None,
            last_evaluation_time: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.state == ExtractorState::On
    }

    /// Resets to `Off` and discards any in-progress trigger, without
    /// touching `last_evaluation_time`. Used when an embedding
    /// pipeline decides a stream has restarted from scratch.
    pub fn reset(&mut self) {
        self.state = ExtractorState::Off;
        self.current_trigger = None;
    }

    /// Feeds one probability packet through the state machine,
    /// returning every trigger window that completed while processing
    /// it (possibly empty, possibly more than one for a very long
    /// packet containing multiple on/off cycles).
    pub fn process_packet<P: Packet>(&mut self, packet: &P) -> Vec<TriggerWindow> {
        let mut completed = Vec::new();
        let period_micros = packet.period_micros();

        let Some(packet_end) = packet.end_time() else {
            tracing::trace!("skipping zero-length probability packet");
            return completed;
        };

        let tolerance_micros = (period_micros / 4.0).round() as i64;

        let desired_next_time = match self.last_evaluation_time {
            Some(t) => t + period_micros.round() as i64,
            None => packet.start_time(),
        };

        if packet_end.as_micros() < desired_next_time.as_micros() - tolerance_micros {
            tracing::trace!(
                phase = ?self.phase,
                "dropping expired probability packet"
            );
            return completed;
        }

        let start_index = match self.resolve_start_index(packet, desired_next_time, period_micros, tolerance_micros) {
            Some(idx) => idx,
            None => {
                tracing::error!(
                    phase = ?self.phase,
                    "algorithmic failure: no sample within tolerance of desired evaluation time, skipping packet"
                );
                return completed;
            }
        };

        for i in start_index..packet.samples().len() {
            let value = packet.samples()[i];
            let t = sample_time(packet.start_time(), i, period_micros);
            self.update(value, t, &mut completed);
            self.last_evaluation_time = Some(t);
        }

        completed
    }

    /// Determines where in `packet` to start evaluating, implementing
    /// the normal/gap/overlap/linear-scan decision tree of spec §4.3.
    /// Returns `None` only for the algorithmic-failure case (spec §7
    /// kind 5): no matching sample even after a full linear scan.
    fn resolve_start_index<P: Packet>(
        &mut self,
        packet: &P,
        desired_next_time: MicroTime,
        period_micros: f64,
        tolerance_micros: i64,
    ) -> Option<usize> {
        let delta = packet.start_time().as_micros() - desired_next_time.as_micros();

        if delta.abs() <= tolerance_micros {
            return Some(0);
        }

        let gap_threshold = self.config.minimum_gap_size as i64 * period_micros.round() as i64;
        if delta > gap_threshold {
            tracing::debug!(phase = ?self.phase, "gap detected, resetting threshold state");
            self.reset();
            return Some(0);
        }

        // Overlap: nearest integer offset, checked at offset-1/offset/offset+1.
        let raw_offset = -delta as f64 / period_micros;
        let offset = raw_offset.round() as i64;
        for candidate in [offset - 1, offset, offset + 1] {
            if candidate < 0 {
                continue;
            }
            let idx = candidate as usize;
            if idx >= packet.samples().len() {
                continue;
            }
            let t = sample_time(packet.start_time(), idx, period_micros);
            if (t.as_micros() - desired_next_time.as_micros()).abs() <= tolerance_micros {
                return Some(idx);
            }
        }

        // Fall back to a full linear scan.
        for idx in 0..packet.samples().len() {
            let t = sample_time(packet.start_time(), idx, period_micros);
            if (t.as_micros() - desired_next_time.as_micros()).abs() <= tolerance_micros {
                return Some(idx);
            }
        }

        None
    }

    fn update(&mut self, value: f64, t: MicroTime, completed: &mut Vec<TriggerWindow>) {
        match self.state {
            ExtractorState::Off => {
                if value >= self.config.on_threshold {
                    let point = SamplePoint { time: t, value };
                    self.current_trigger = Some(PartialTrigger {
                        start: point,
                        max: point,
                    });
                    self.state = ExtractorState::On;
                }
            }
            ExtractorState::On => {
                if value < self.config.off_threshold {
                    let trigger = self
                        .current_trigger
                        .take()
                        .expect("On state always carries a current trigger");
                    let end = SamplePoint { time: t, value };
                    let max = if end.value > trigger.max.value {
                        end
                    } else {
                        trigger.max
                    };
                    completed.push(TriggerWindow {
                        start: trigger.start,
                        end,
                        max,
                    });
                    self.state = ExtractorState::Off;
                } else {
                    let trigger = self
                        .current_trigger
                        .as_mut()
                        .expect("On state always carries a current trigger");
                    if value > trigger.max.value {
                        trigger.max = SamplePoint { time: t, value };
                    }
                    if let Some(max_duration) = self.config.max_trigger_duration_micros {
                        if t.as_micros() - trigger.start.time.as_micros() > max_duration {
                            tracing::debug!(phase = ?self.phase, "trigger exceeded max duration, discarding");
                            self.state = ExtractorState::Off;
                            self.current_trigger = None;
                        }
                    }
                }
            }
        }
    }
}

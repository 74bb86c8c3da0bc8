use urts_threshold::ThresholdConfig;

use crate::error::ConfigError;

/// Paired P/S threshold-detector settings (spec §6 threshold-detector keys).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdDetectorConfig {
    pub p_on_threshold: f64,
    pub p_off_threshold: f64,
    pub p_minimum_gap_size: u32,
    pub s_on_threshold: f64,
    pub s_off_threshold: f64,
    pub s_minimum_gap_size: u32,
}

impl Default for ThresholdDetectorConfig {
    fn default() -> Self {
        Self {
            p_on_threshold: 0.8,
            p_off_threshold: 0.5,
            p_minimum_gap_size: 5,
            s_on_threshold: 0.8,
            s_off_threshold: 0.5,
            s_minimum_gap_size: 5,
        }
    }
}

impl ThresholdDetectorConfig {
    /// `on_threshold < off_threshold` is an unusual but legal
    /// configuration (spec §4.3's "unusual case" note) and is not
    /// rejected here; only out-of-range probabilities and impossible
    /// gap sizes are configuration errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_probability("ThresholdDetector.pOnThreshold", self.p_on_threshold)?;
        validate_probability("ThresholdDetector.pOffThreshold", self.p_off_threshold)?;
        validate_probability("ThresholdDetector.sOnThreshold", self.s_on_threshold)?;
        validate_probability("ThresholdDetector.sOffThreshold", self.s_off_threshold)?;
        if self.p_minimum_gap_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "ThresholdDetector.pMinimumGapSize",
                value: 0.0,
            });
        }
        if self.s_minimum_gap_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "ThresholdDetector.sMinimumGapSize",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Splits into the pair of extractor configs a deployment
    /// constructs its P and S `ThresholdExtractor`s from.
    pub fn p_threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            on_threshold: self.p_on_threshold,
            off_threshold: self.p_off_threshold,
            minimum_gap_size: self.p_minimum_gap_size,
            max_trigger_duration_micros: None,
        }
    }

    pub fn s_threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            on_threshold: self.s_on_threshold,
            off_threshold: self.s_off_threshold,
            minimum_gap_size: self.s_minimum_gap_size,
            max_trigger_duration_micros: None,
        }
    }
}

fn validate_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

use crate::error::ConfigError;

/// Associator service settings (spec §6 associator-specific keys).
/// `static_corrections`/`source_specific_corrections` are path hints
/// to correction tables; reading and parsing those files is outside
/// this crate (no file-format parsing is specified).
#[derive(Debug, Clone, PartialEq)]
pub struct AssociatorConfig {
    pub region: String,
    pub dbscan_epsilon: f64,
    pub dbscan_minimum_cluster_size: u32,
    pub number_of_particles: u32,
    pub number_of_epochs: u32,
    pub maximum_distance_to_associate: f64,
    pub minimum_search_depth: f64,
    pub maximum_search_depth: f64,
    pub static_corrections: Option<String>,
    pub source_specific_corrections: Option<String>,
}

impl AssociatorConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            dbscan_epsilon: 0.25,
            dbscan_minimum_cluster_size: 7,
            number_of_particles: 60,
            number_of_epochs: 20,
            maximum_distance_to_associate: 150.0,
            minimum_search_depth: -1_700.0,
            maximum_search_depth: 22_000.0,
            static_corrections: None,
            source_specific_corrections: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "Associator.region",
            });
        }
        if self.dbscan_epsilon <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "Associator.dbscanEpsilon",
                value: self.dbscan_epsilon,
            });
        }
        if self.dbscan_minimum_cluster_size < 1 {
            return Err(ConfigError::NotPositive {
                field: "Associator.dbscanMinimumClusterSize",
                value: self.dbscan_minimum_cluster_size as f64,
            });
        }
        if self.number_of_particles < 1 {
            return Err(ConfigError::NotPositive {
                field: "Associator.numberOfParticles",
                value: self.number_of_particles as f64,
            });
        }
        if self.number_of_epochs < 1 {
            return Err(ConfigError::NotPositive {
                field: "Associator.numberOfEpochs",
                value: self.number_of_epochs as f64,
            });
        }
        if self.maximum_distance_to_associate <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "Associator.maximumDistanceToAssociate",
                value: self.maximum_distance_to_associate,
            });
        }
        if self.minimum_search_depth > self.maximum_search_depth {
            return Err(ConfigError::OutOfOrder {
                low_field: "Associator.minimumSearchDepth",
                low: self.minimum_search_depth,
                high_field: "Associator.maximumSearchDepth",
                high: self.maximum_search_depth,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AssociatorConfig::new("Utah").validate().is_ok());
    }

    #[test]
    fn inverted_depth_bounds_are_rejected() {
        let mut config = AssociatorConfig::new("Utah");
        config.minimum_search_depth = 30_000.0;
        config.maximum_search_depth = 1_000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_epsilon_is_rejected() {
        let mut config = AssociatorConfig::new("Utah");
        config.dbscan_epsilon = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_region_is_rejected() {
        let config = AssociatorConfig::new("  ");
        assert!(config.validate().is_err());
    }
}

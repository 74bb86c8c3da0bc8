use crate::error::ConfigError;

/// The `General` section carried by every module (spec §6): identity,
/// verbosity, and where its log file would live. `log_file_directory`
/// is a path hint only — no logger sink is constructed by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralConfig {
    pub module_name: String,
    pub verbose: bool,
    pub log_file_directory: Option<String>,
}

impl GeneralConfig {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            verbose: false,
            log_file_directory: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_name.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                field: "General.moduleName",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_module_name_is_rejected() {
        let config = GeneralConfig::new("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn named_module_validates() {
        let config = GeneralConfig::new("pickerUtah");
        assert!(config.validate().is_ok());
    }
}

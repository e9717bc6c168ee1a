use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_GUEST_MESSAGE: &str =
    "Guest games last a single round. Log in to play a full game.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Game rules. Missing YAML keys fall back to the standard game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_hand_size: usize,
    pub winning_hand_size: usize,
    pub max_incorrect_attempts: u32,
    pub guest_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_hand_size: 3,
            winning_hand_size: 6,
            max_incorrect_attempts: 3,
            guest_message: DEFAULT_GUEST_MESSAGE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_hand_size == 0 {
            return Err(ConfigError::Invalid(
                "initial_hand_size must be at least 1".to_string(),
            ));
        }
        if self.winning_hand_size <= self.initial_hand_size {
            return Err(ConfigError::Invalid(format!(
                "winning_hand_size ({}) must exceed initial_hand_size ({})",
                self.winning_hand_size, self.initial_hand_size
            )));
        }
        if self.max_incorrect_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_incorrect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_hand_size, 3);
        assert_eq!(config.winning_hand_size, 6);
        assert_eq!(config.max_incorrect_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("winning_hand_size: 8\n").unwrap();
        assert_eq!(config.winning_hand_size, 8);
        assert_eq!(config.initial_hand_size, 3);
        assert_eq!(config.guest_message, DEFAULT_GUEST_MESSAGE);
    }

    #[test]
    fn test_rejects_unwinnable_rules() {
        let err = EngineConfig::from_yaml_str("initial_hand_size: 6\nwinning_hand_size: 6\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_yaml_str("max_incorrect_attempts: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(matches!(
            EngineConfig::from_yaml_str("initial_hand_size: [three]"),
            Err(ConfigError::Yaml(_))
        ));
    }
}

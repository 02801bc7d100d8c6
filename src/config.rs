//! Configuration for BovHEAT.
//!
//! [`Config`] holds the persisted defaults used by the CLI. The analysis
//! core only ever sees the validated [`AnalysisParams`] value object.

use crate::ingest::HeaderLanguage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound of the threshold and minimum heat length options.
pub const MAX_PARAM: u32 = 100;

/// Parameters consumed by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Column header language of the exports
    pub language: HeaderLanguage,
    /// First day of the observation window, relative to calving (may be negative)
    pub start_dim: i64,
    /// Day the observation window ends (exclusive), relative to calving
    pub stop_dim: i64,
    /// Activity threshold for heat detection (0-100)
    pub threshold: u32,
    /// Minimum number of consecutive observations for a heat (1-100)
    pub min_heat_length: usize,
    /// Maximum number of consecutive missing steps to interpolate, `None` disables
    pub interpolation_limit: Option<usize>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            language: HeaderLanguage::Eng,
            start_dim: 0,
            stop_dim: 30,
            threshold: 35,
            min_heat_length: 1,
            interpolation_limit: Some(2),
        }
    }
}

impl AnalysisParams {
    /// Check the value ranges the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_dim >= self.stop_dim {
            return Err(ConfigError::Invalid(format!(
                "start DIM ({}) must be lower than stop DIM ({})",
                self.start_dim, self.stop_dim
            )));
        }
        if self.threshold > MAX_PARAM {
            return Err(ConfigError::Invalid(format!(
                "threshold {} is outside 0-{MAX_PARAM}",
                self.threshold
            )));
        }
        if self.min_heat_length < 1 || self.min_heat_length > MAX_PARAM as usize {
            return Err(ConfigError::Invalid(format!(
                "minimum heat length {} is outside 1-{MAX_PARAM}",
                self.min_heat_length
            )));
        }
        Ok(())
    }

    /// Normalize an interpolation cap where 0 means disabled.
    pub fn interpolation_cap(limit: usize) -> Option<usize> {
        (limit > 0).then_some(limit)
    }
}

/// Persisted defaults for the command line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub language: HeaderLanguage,
    pub start_dim: i64,
    pub stop_dim: i64,
    pub threshold: u32,
    pub min_heat_length: usize,
    /// 0 disables interpolation
    pub interpolation_limit: usize,
    /// Worker threads for reading exports, 0 = auto
    pub cores: usize,
    /// Directory the result files are written to
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let params = AnalysisParams::default();
        Self {
            language: params.language,
            start_dim: params.start_dim,
            stop_dim: params.stop_dim,
            threshold: params.threshold,
            min_heat_length: params.min_heat_length,
            interpolation_limit: params.interpolation_limit.unwrap_or(0),
            cores: 0,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file, falling back to defaults if it does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bovheat")
            .join("config.json")
    }

    /// The analysis parameters described by this configuration.
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams {
            language: self.language,
            start_dim: self.start_dim,
            stop_dim: self.stop_dim,
            threshold: self.threshold,
            min_heat_length: self.min_heat_length,
            interpolation_limit: AnalysisParams::interpolation_cap(self.interpolation_limit),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.threshold, 35);
        assert_eq!(config.min_heat_length, 1);
        assert_eq!(config.interpolation_limit, 2);
        assert_eq!(config.cores, 0);
        assert!(config.params().validate().is_ok());
    }

    #[test]
    fn test_zero_interpolation_disables() {
        let config = Config {
            interpolation_limit: 0,
            ..Config::default()
        };
        assert_eq!(config.params().interpolation_limit, None);
    }

    #[test]
    fn test_validate_ranges() {
        let params = AnalysisParams {
            start_dim: 10,
            stop_dim: 10,
            ..AnalysisParams::default()
        };
        assert!(matches!(params.validate(), Err(ConfigError::Invalid(_))));

        let params = AnalysisParams {
            start_dim: -5,
            stop_dim: 30,
            ..AnalysisParams::default()
        };
        assert!(params.validate().is_ok());

        let params = AnalysisParams {
            threshold: 101,
            ..AnalysisParams::default()
        };
        assert!(params.validate().is_err());

        let params = AnalysisParams {
            min_heat_length: 0,
            ..AnalysisParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            language: HeaderLanguage::Ger,
            threshold: 40,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.language, HeaderLanguage::Ger);
        assert_eq!(loaded.threshold, 40);
    }

    #[test]
    fn test_load_missing_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.stop_dim, 30);
    }
}

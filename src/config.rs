//! Configuration management for watch-grader

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::grader::SamplingPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Progress sampling settings
    pub grading: GradingConfig,

    /// Grade reporting settings
    pub report: ReportConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Data directory (default: ~/.local/share/watch-grader)
    pub data_dir: Option<PathBuf>,
}

/// Progress sampling behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Shortest interval between two accepted progress samples
    pub sample_interval_ms: u64,

    /// Timeline buckets for media long enough to deliver one sample per bucket
    pub resolution: u32,
}

/// Grade reporting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Request timeout for a single grade report
    pub timeout_seconds: u64,

    /// User agent sent with grade reports
    pub user_agent: String,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
        }
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            resolution: 100,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("{}/{}", crate::APP_NAME, crate::VERSION),
        }
    }
}

impl GradingConfig {
    /// Sampling policy handed to percent graders
    #[must_use]
    pub const fn sampling_policy(&self) -> SamplingPolicy {
        SamplingPolicy {
            min_interval: Duration::from_millis(self.sample_interval_ms),
            resolution: self.resolution,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Could not determine config directory"))?;
        Ok(config_dir.join(crate::APP_NAME).join("config.toml"))
    }

    /// Get the data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.general.data_dir {
            Ok(dir.clone())
        } else {
            let data_dir = dirs::data_local_dir()
                .ok_or_else(|| Error::config("Could not determine data directory"))?;
            Ok(data_dir.join(crate::APP_NAME))
        }
    }

    /// Get the path of the earned-score file
    pub fn scores_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("scores.json"))
    }

    /// Validate configuration values.
    ///
    /// Call this after loading to ensure all values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if self.grading.sample_interval_ms == 0 {
            return Err(Error::config("sample_interval_ms must be greater than 0"));
        }

        if !(1..=1000).contains(&self.grading.resolution) {
            return Err(Error::config(format!(
                "resolution must be between 1 and 1000, got {}",
                self.grading.resolution
            )));
        }

        if self.report.timeout_seconds == 0 || self.report.timeout_seconds > 300 {
            return Err(Error::config(format!(
                "timeout_seconds must be between 1 and 300, got {}",
                self.report.timeout_seconds
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level must be one of {:?}, got '{}'",
                valid_levels, self.general.log_level
            )));
        }

        Ok(())
    }
}

//! Configuration system
//!
//! Provides layered configuration with:
//! - Runtime defaults
//! - Config file loading (optional)
//! - Environment variable overrides
//! - Validation

use crate::analyzer::{Thresholds, DEFAULT_GROWTH_THRESHOLD, DEFAULT_INVALIDATION_THRESHOLD};
use crate::display::DEFAULT_TABLE_WIDTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "transcript-analyzer.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Cache-event detection thresholds
    pub analysis: AnalysisConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Paths configuration
    pub paths: PathsConfig,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub invalidation_threshold: u64,
    pub growth_threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: bool,
    pub table_width: usize,
    pub json_pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Replaces the built-in price table when set
    pub pricing_file: Option<PathBuf>,
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            invalidation_threshold: DEFAULT_INVALIDATION_THRESHOLD,
            growth_threshold: DEFAULT_GROWTH_THRESHOLD,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            table_width: DEFAULT_TABLE_WIDTH,
            json_pretty: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pricing_file: None,
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl AnalysisConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            invalidation: self.invalidation_threshold,
            growth: self.growth_threshold,
        }
    }
}

impl LoggingConfig {
    pub fn writes_to_file(&self) -> bool {
        matches!(self.output.as_str(), "file" | "both")
    }
}

impl Config {
    /// Load configuration from defaults, the first config file found, and environment.
    ///
    /// Not validated here; callers layer their own overrides and then call [`Config::validate`].
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from(format!(".{}", CONFIG_FILE_NAME)),
            dirs::config_dir()
                .map(|d| d.join("transcript-analyzer").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                config = Self::load_from_file(path)?;
                config.source = Some(path.clone());
                break;
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Analysis overrides
        if let Ok(val) = env::var("TRANSCRIPT_INVALIDATION_THRESHOLD") {
            self.analysis.invalidation_threshold = val
                .parse()
                .context("Invalid TRANSCRIPT_INVALIDATION_THRESHOLD")?;
        }
        if let Ok(val) = env::var("TRANSCRIPT_GROWTH_THRESHOLD") {
            self.analysis.growth_threshold = val
                .parse()
                .context("Invalid TRANSCRIPT_GROWTH_THRESHOLD")?;
        }

        // Path overrides
        if let Ok(val) = env::var("TRANSCRIPT_PRICING_FILE") {
            self.paths.pricing_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("TRANSCRIPT_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.analysis.invalidation_threshold == 0 {
            return Err(anyhow::anyhow!("Invalidation threshold must be greater than 0"));
        }

        if self.analysis.growth_threshold == 0 {
            return Err(anyhow::anyhow!("Growth threshold must be greater than 0"));
        }

        if self.output.table_width < 40 {
            return Err(anyhow::anyhow!(
                "Table width must be at least 40 columns, got {}",
                self.output.table_width
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json" | "compact") {
            return Err(anyhow::anyhow!(
                "Unknown log format '{}', expected pretty, json or compact",
                self.logging.format
            ));
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            return Err(anyhow::anyhow!(
                "Unknown log output '{}', expected console, file or both",
                self.logging.output
            ));
        }

        if self.logging.writes_to_file() && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }

    /// Emit notes about the loaded configuration. Call once logging is initialized.
    pub fn log_diagnostics(&self) {
        if let Some(source) = &self.source {
            info!(config_file = %source.display(), "Loaded configuration from file");
        }

        if self.analysis.growth_threshold > self.analysis.invalidation_threshold {
            warn!(
                growth_threshold = self.analysis.growth_threshold,
                invalidation_threshold = self.analysis.invalidation_threshold,
                "Growth threshold exceeds invalidation threshold"
            );
        }
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

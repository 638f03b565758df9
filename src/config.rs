//! Configuration module for the SoC controller
//!
//! Loads the miner list from a TOML file:
//! - [default] - General settings (log_level)
//! - [[miners]] - One entry per controlled rig

use serde::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Log level for the application
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing LevelFilter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LogLevel::Trace => "TRACE",
                LogLevel::Debug => "DEBUG",
                LogLevel::Info => "INFO",
                LogLevel::Warn => "WARN",
                LogLevel::Error => "ERROR",
            }
        )
    }
}

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,
    #[serde(default)]
    pub miners: Vec<MinerConfig>,
}

/// General application settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DefaultConfig {
    /// Log level: TRACE, DEBUG, INFO, WARN, ERROR
    #[serde(default)]
    pub log_level: LogLevel,
}

/// One controlled miner
#[derive(Deserialize, Clone)]
pub struct MinerConfig {
    /// Miner IP address (required)
    pub ip: IpAddr,

    /// Web GUI password for /unlock
    #[serde(default = "default_password")]
    pub password: String,

    /// Stop mining when SoC drops below this percentage
    pub stop_soc: f64,

    /// Resume mining when SoC rises above this percentage
    pub resume_soc: f64,
}

fn default_password() -> String {
    "admin".to_string()
}

impl MinerConfig {
    /// A degenerate dead-band still works (strict inequalities on both
    /// sides), it just invites start/stop cycling. Reported as a startup
    /// warning rather than rejected.
    pub fn has_inverted_band(&self) -> bool {
        self.resume_soc <= self.stop_soc
    }
}

impl std::fmt::Debug for MinerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("MinerConfig")
            .field("ip", &self.ip)
            .field("password", &"***REDACTED***")
            .field("stop_soc", &self.stop_soc)
            .field("resume_soc", &self.resume_soc)
            .finish()
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the miners.toml file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration logic (semantic validation beyond type checks)
    fn validate(&self) -> Result<(), ConfigError> {
        for miner in &self.miners {
            for (name, soc) in [("stop_soc", miner.stop_soc), ("resume_soc", miner.resume_soc)] {
                if !soc.is_finite() || !(0.0..=100.0).contains(&soc) {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: {} must be a percentage in 0-100, got {}",
                        miner.ip, name, soc
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

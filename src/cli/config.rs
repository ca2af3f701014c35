//! CLI Configuration.
//!
//! `config.json` in the data directory, overridable from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::output::OutputFormat;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "config.json";

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Data directory (protocol snapshot and this file)
    pub data_dir: PathBuf,
    /// Default tracing filter directive
    pub log_level: String,
    /// Default acting account (label or 0x-hex address)
    pub account: String,
    /// Administrator account used by `init`
    pub admin: String,
    /// Output format
    pub output: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".into(),
            account: "alice".into(),
            admin: "admin".into(),
            output: OutputFormat::Text,
        }
    }
}

impl CliConfig {
    /// Load from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("VNDT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.apply_env();
        config
    }

    /// Load `<data_dir>/config.json` if present, then apply environment overrides
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }

        let path = config.config_path();
        if path.exists() {
            let data_dir = config.data_dir.clone();
            config = Self::load(&path)?;
            config.data_dir = data_dir;
            config.apply_env();
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply `VNDT_LOG_LEVEL` and `VNDT_ACCOUNT`
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var("VNDT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(account) = std::env::var("VNDT_ACCOUNT") {
            self.account = account;
        }
    }

    /// Path of the config file for this data directory
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("data directory cannot be empty".into()));
        }
        if self.account.trim().is_empty() {
            return Err(ConfigError::Validation("account cannot be empty".into()));
        }
        if self.admin.trim().is_empty() {
            return Err(ConfigError::Validation("admin cannot be empty".into()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default data directory
fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library/Application Support/vndt");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("vndt");
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".vndt");
        }
    }

    PathBuf::from(".vndt")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

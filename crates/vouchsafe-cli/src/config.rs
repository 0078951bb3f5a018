//! CLI configuration.
//!
//! A single TOML file with a `[logging]` table and an `[escrow]` table for
//! the engine used by `simulate`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vouchsafe_escrow::EscrowConfig;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Engine configuration for simulations
    pub escrow: EscrowConfig,
}

impl CliConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: CliConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => anyhow::bail!("Unknown log format '{}': expected 'pretty' or 'json'", other),
        }

        self.escrow.validate()?;
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directives
    pub level: String,
    /// Log to file instead of stderr
    pub log_file: Option<PathBuf>,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_file: None,
            format: "pretty".to_string(),
        }
    }
}

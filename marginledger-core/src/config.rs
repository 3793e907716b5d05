//! Serializable ledger configuration (TOML).

use crate::domain::Address;
use crate::interest::SECONDS_PER_YEAR;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ledger-wide settings.
///
/// ```toml
/// vault_label = "margin-vault"
/// seconds_per_year = 31536000
///
/// [logging]
/// level = "info"
/// format = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Label the vault address is derived from. The vault custodies all
    /// collateral and is the spender users approve.
    pub vault_label: String,
    /// Length of an interest year in seconds.
    pub seconds_per_year: u64,
    pub logging: LoggingConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            vault_label: "marginledger-vault".into(),
            seconds_per_year: SECONDS_PER_YEAR,
            logging: LoggingConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn vault(&self) -> Address {
        Address::from_label(&self.vault_label)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.vault_label.trim().is_empty() {
            return Err(ConfigError::Invalid("vault_label must not be empty".into()));
        }
        if self.seconds_per_year == 0 {
            return Err(ConfigError::Invalid("seconds_per_year must be positive".into()));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown log format '{other}'"))),
        }
    }
}

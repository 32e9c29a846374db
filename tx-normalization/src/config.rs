//! Configuration for the normalization pipeline

use serde::{Deserialize, Serialize};

/// Normalization pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum attempts for an FX port call before the transaction fails (C13)
    pub max_attempts: u32,
    /// Base backoff delay in seconds for FX port retries
    pub backoff_base_seconds: u64,
    /// Backoff cap in seconds for FX port retries
    pub backoff_cap_seconds: u64,
    /// Currencies the converter will request a rate for
    pub supported_currencies: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_seconds: 2,
            backoff_cap_seconds: 32,
            supported_currencies: tx_core::validate::SUPPORTED_CURRENCIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("failed to read config file: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overridden by environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(attempts) = std::env::var("NORMALIZATION_MAX_ATTEMPTS") {
            config.max_attempts = attempts
                .parse()
                .map_err(|_| crate::Error::Config("NORMALIZATION_MAX_ATTEMPTS must be an integer".to_string()))?;
        }
        if let Ok(base) = std::env::var("NORMALIZATION_BACKOFF_BASE_SECONDS") {
            config.backoff_base_seconds = base
                .parse()
                .map_err(|_| crate::Error::Config("NORMALIZATION_BACKOFF_BASE_SECONDS must be an integer".to_string()))?;
        }
        if let Ok(cap) = std::env::var("NORMALIZATION_BACKOFF_CAP_SECONDS") {
            config.backoff_cap_seconds = cap
                .parse()
                .map_err(|_| crate::Error::Config("NORMALIZATION_BACKOFF_CAP_SECONDS must be an integer".to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.max_attempts == 0 {
            return Err(crate::Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.backoff_base_seconds == 0 {
            return Err(crate::Error::Config("backoff_base_seconds must be at least 1".to_string()));
        }
        if self.backoff_cap_seconds < self.backoff_base_seconds {
            return Err(crate::Error::Config(
                "backoff_cap_seconds must be >= backoff_base_seconds".to_string(),
            ));
        }
        Ok(())
    }
}

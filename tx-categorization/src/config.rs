//! Configuration for the categorization pipeline

use serde::{Deserialize, Serialize};

/// Categorization pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transactions per AI Port batch (C10)
    pub batch_size: usize,
    /// How many historical matches to collect per transaction as AI context,
    /// capped at `context_size * batch_size` per batch (C10)
    pub context_size: usize,
    /// How many days back the historical pattern learner looks for
    /// candidates (C8)
    pub lookback_days: i64,
    /// Minimum token-set Jaccard similarity (expressed 0-100) to count as a
    /// fuzzy match (C8)
    pub fuzzy_threshold: u8,
    /// Maximum relative difference in GBP amount to count as an amount-range
    /// match (C8)
    pub amount_tolerance: f64,
    /// Weight given to the AI confidence score in the final blend (C9)
    pub ai_weight: f64,
    /// Weight given to the historical-pattern score in the final blend (C9)
    pub historical_weight: f64,
    /// Minimum number of historical matches required before consensus/
    /// conflict adjustment applies (C9)
    pub min_matches: usize,
    /// Points added when the AI and historical suggestion agree (C9)
    pub consensus_bonus: f64,
    /// Points subtracted when they disagree (C9)
    pub conflict_penalty: f64,
    /// Maximum suggestions returned by the category resolver (C7)
    pub max_suggestions: usize,
    /// Whether a `Categorised` transaction without a manual override is
    /// eligible for re-categorization on a later run (Open Question 3)
    pub allow_recategorisation: bool,
    /// Max attempts for an AI Port call before the batch fails (C13)
    pub max_attempts: u32,
    /// Base backoff delay in seconds for AI Port retries
    pub backoff_base_seconds: u64,
    /// Backoff cap in seconds for AI Port retries
    pub backoff_cap_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 10,
            context_size: 3,
            lookback_days: 90,
            fuzzy_threshold: 60,
            amount_tolerance: 0.10,
            ai_weight: 0.6,
            historical_weight: 0.4,
            min_matches: 2,
            consensus_bonus: 15.0,
            conflict_penalty: 15.0,
            max_suggestions: 5,
            allow_recategorisation: false,
            max_attempts: 5,
            backoff_base_seconds: 2,
            backoff_cap_seconds: 32,
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

    fn validate(&self) -> crate::Result<()> {
        let weight_sum = self.ai_weight + self.historical_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(crate::Error::Config(format!(
                "ai_weight + historical_weight must sum to 1.0 +/- 0.01, got {weight_sum}"
            )));
        }
        if self.batch_size == 0 {
            return Err(crate::Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.consensus_bonus < 0.0 || self.conflict_penalty < 0.0 {
            return Err(crate::Error::Config(
                "consensus_bonus and conflict_penalty must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

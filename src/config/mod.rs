//! Configuration management.

mod file_config;

pub use file_config::{find_config_file, load_config, ConfigError};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::harvest::SchedulerConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External service endpoints and credentials
    #[serde(default)]
    pub services: ServicesConfig,

    /// Fixed delays used by the harvest and backfill loops
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Run-level safety limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Apply environment overrides on top of whatever was loaded
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("BOOKHARVEST_API_KEY") {
            self.services.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("BOOKHARVEST_SEARCH_URL") {
            self.services.search_url = url;
        }
        if let Ok(url) = std::env::var("BOOKHARVEST_CATALOG_URL") {
            self.services.catalog_url = url;
        }
        self
    }

    /// Scheduler knobs derived from pacing + limits
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            page_delay: Duration::from_millis(self.pacing.page_delay_ms),
            transient_delay: Duration::from_millis(self.pacing.transient_retry_delay_ms),
            rate_limit_fallback: Duration::from_millis(self.pacing.rate_limit_fallback_ms),
            max_consecutive_errors: self.limits.max_consecutive_errors,
            retries_per_page: self.limits.retries_per_page,
            max_records: self.limits.max_records,
        }
    }

    /// Pause between backfill batch calls
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.pacing.batch_delay_ms)
    }
}

/// External service endpoints and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Search service API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search service root URL
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Catalog service root URL
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            search_url: default_search_url(),
            catalog_url: default_catalog_url(),
        }
    }
}

fn default_search_url() -> String {
    "https://api2.isbndb.com".to_string()
}

fn default_catalog_url() -> String {
    "http://localhost:3000/api".to_string()
}

/// Fixed delays (milliseconds) for the run loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Between successful search pages
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Before retrying a transient page failure
    #[serde(default = "default_transient_delay_ms")]
    pub transient_retry_delay_ms: u64,

    /// For a rate limit carrying no Retry-After header
    #[serde(default = "default_rate_limit_fallback_ms")]
    pub rate_limit_fallback_ms: u64,

    /// Between backfill batch calls
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            transient_retry_delay_ms: default_transient_delay_ms(),
            rate_limit_fallback_ms: default_rate_limit_fallback_ms(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_transient_delay_ms() -> u64 {
    5000
}

fn default_rate_limit_fallback_ms() -> u64 {
    60_000
}

fn default_batch_delay_ms() -> u64 {
    5000
}

/// Run-level safety limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Accumulated-record cap per run
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Transient failures in a row before a run aborts
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Retries per page before it is skipped
    #[serde(default = "default_retries_per_page")]
    pub retries_per_page: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            max_consecutive_errors: default_max_consecutive_errors(),
            retries_per_page: default_retries_per_page(),
        }
    }
}

fn default_max_records() -> usize {
    5000
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_retries_per_page() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let config = Config::default();
        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.page_delay, Duration::from_secs(2));
        assert_eq!(scheduler.transient_delay, Duration::from_secs(5));
        assert_eq!(scheduler.rate_limit_fallback, Duration::from_secs(60));
        assert_eq!(scheduler.max_consecutive_errors, 5);
        assert_eq!(scheduler.retries_per_page, 2);
        assert_eq!(scheduler.max_records, 5000);
        assert_eq!(config.batch_delay(), Duration::from_secs(5));
    }
}

//! Configuration file support.
//!
//! Settings are read from a TOML file, with environment variables taking
//! precedence over file values.
//!
//! # Configuration File Format
//!
//! ```toml
//! [services]
//! api_key = "your-api-key"
//! search_url = "https://api2.isbndb.com"
//! catalog_url = "http://localhost:3000/api"
//!
//! [pacing]
//! page_delay_ms = 2000
//! transient_retry_delay_ms = 5000
//! rate_limit_fallback_ms = 60000
//! batch_delay_ms = 5000
//!
//! [limits]
//! max_records = 5000
//! max_consecutive_errors = 5
//! retries_per_page = 2
//! ```
//!
//! # Search Order
//!
//! 1. `BOOKHARVEST_CONFIG` environment variable
//! 2. `./bookharvest.toml`
//! 3. `<config dir>/bookharvest/config.toml`

use std::path::{Path, PathBuf};

use crate::config::Config;

/// Errors from loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Locate a configuration file, if any exists.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BOOKHARVEST_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from("bookharvest.toml");
    if local.exists() {
        return Some(local);
    }

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("bookharvest").join("config.toml");
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Load configuration from an explicit path, or from the search order when
/// none is given. Missing files yield defaults; environment overrides are
/// always applied last.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?
        }
        None => Config::default(),
    };

    Ok(config.with_env_overrides())
}

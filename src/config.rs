use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::codex::index::DEFAULT_MIN_TOKEN_LEN;

/// Top-level codex configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexConfig {
    pub index: IndexConfig,
    pub resolver: ResolverConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

/// Name index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Shortest word (in characters) indexed from a multi-word name.
    pub min_token_len: usize,
}

/// Fuzzy matching thresholds and caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Queries shorter than this use `short_query_threshold`.
    pub short_query_len: usize,
    pub short_query_threshold: usize,
    /// Longer queries allow `len / threshold_divisor` edits.
    pub threshold_divisor: usize,
    /// Memoize resolutions during a merge run.
    pub use_cache: bool,
}

/// Registry sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Override files, loaded in order.
    pub files: Vec<PathBuf>,
    /// Date for current state, as a quoted `"YYYY-MM-DD"`. Today when unset.
    pub reference_date: Option<NaiveDate>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Override the log directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            short_query_len: 5,
            short_query_threshold: 1,
            threshold_divisor: 3,
            use_cache: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            log_dir: None,
        }
    }
}

impl CodexConfig {
    /// Load configuration from `~/.config/campaign-codex/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolved log directory (override or XDG data dir).
    pub fn log_dir(&self) -> PathBuf {
        self.logging.log_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("campaign-codex").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("campaign-codex").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

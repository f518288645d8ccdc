//! Configuration for the `fit` tool
//!
//! Settings come from an optional `fit.toml`, then environment variables:
//!
//! - `FIT_DB_PATH` - Directory of the RocksDB column store
//! - `FIT_LOG` - Tracing filter, e.g. `fit=debug`
//! - `FIT_LINES` - Default number of rows printed by `fit show`
//!
//! These can be set in a `.env` file in the working directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::grouping::Seed;
use crate::storage::Compression;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "fit.toml";

/// Environment variable names
pub const ENV_DB_PATH: &str = "FIT_DB_PATH";
pub const ENV_LOG: &str = "FIT_LOG";
pub const ENV_LINES: &str = "FIT_LINES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Column store directory
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Rows printed by `show` unless `-n` is given
    #[serde(default = "default_lines")]
    pub lines: usize,
    /// Compression of stored matrices
    #[serde(default)]
    pub compression: Compression,
    /// Where duration windows start counting
    #[serde(default)]
    pub seed: Seed,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./fit-data")
}

fn default_log_filter() -> String {
    "fit=info".to_string()
}

fn default_lines() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_filter: default_log_filter(),
            lines: default_lines(),
            compression: Compression::default(),
            seed: Seed::default(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `fit.toml` in the working
    /// directory is used when present, otherwise defaults. A `.env` file is
    /// loaded first and environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                Self::from_file(path)?
            }
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    /// Empty or unparsable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.db_path = PathBuf::from(db_path);
        }

        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log_filter = filter;
        }

        if let Some(lines) = lookup(ENV_LINES).and_then(|v| v.parse::<usize>().ok()) {
            self.lines = lines;
        }
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

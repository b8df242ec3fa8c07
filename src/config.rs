use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::release::error::RepositoryIdError;
use crate::release::types::RepositoryId;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default poll interval in milliseconds (5 hours)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5 * 60 * 60 * 1000;

/// Timeout for a single release fetch in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Delay before retrying a repository whose first refresh failed (5 minutes)
pub const DEFAULT_SETUP_RETRY_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Default base URL for the GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid repository {entry:?}: {source}")]
    Repository {
        entry: String,
        #[source]
        source: RepositoryIdError,
    },
}

/// Tracker configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Repositories to track, as `owner/name` or GitHub URLs
    pub repositories: Vec<String>,
    /// Poll interval in milliseconds
    pub poll_interval: u64,
    /// Per-request timeout in milliseconds
    pub fetch_timeout: u64,
    pub base_url: String,
    /// Retry delay for repositories that failed their first refresh, in milliseconds
    pub setup_retry_interval: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL_MS,
            fetch_timeout: FETCH_TIMEOUT_MS,
            base_url: DEFAULT_BASE_URL.to_string(),
            setup_retry_interval: DEFAULT_SETUP_RETRY_INTERVAL_MS,
        }
    }
}

impl TrackerConfig {
    /// Loads a JSON config file. Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses every configured repository entry, failing on the first invalid one
    pub fn repository_ids(&self) -> Result<Vec<RepositoryId>, ConfigError> {
        self.repositories
            .iter()
            .map(|entry| {
                entry
                    .parse::<RepositoryId>()
                    .map_err(|source| ConfigError::Repository {
                        entry: entry.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }

    pub fn setup_retry_interval(&self) -> Duration {
        Duration::from_millis(self.setup_retry_interval)
    }
}

/// Returns the path to the data directory for release-tracker.
/// Uses $XDG_DATA_HOME/release-tracker if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/release-tracker,
/// or ./release-tracker if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the directory the log files are written to.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("release-tracker")
}

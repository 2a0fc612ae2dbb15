//! Configuration for spinstats
//!
//! One explicit record, built from the process environment at startup and
//! passed by reference into the cache and sync components. A `.env` file in
//! the working directory fills in variables that are not already set.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default freshness threshold in seconds
const DEFAULT_CACHE_TIMEOUT: u64 = 600;

/// Default cache file, relative to the working directory
const DEFAULT_CACHE_FILE: &str = "songs.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Scrobbling service API key
    pub lastfm_api_key: String,

    /// Scrobbling service username whose stats are served
    pub lastfm_username: String,

    /// Catalog service client id
    pub spotify_client_id: String,

    /// Catalog service client secret
    pub spotify_client_secret: String,

    /// Max cache file age in seconds before a read triggers a refresh.
    /// Zero means refresh on every read.
    pub cache_timeout: u64,

    /// Path of the cache file
    pub cache_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lastfm_api_key: String::new(),
            lastfm_username: String::new(),
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Missing credentials are not an error at this point; they surface as
    /// auth or fetch failures once a sync actually runs.
    pub fn from_env() -> Self {
        let cache_timeout = std::env::var("CACHE_TIMEOUT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_CACHE_TIMEOUT);

        let cache_file = std::env::var("CACHE_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE));

        Self {
            lastfm_api_key: env_or_default("LASTFM_API_KEY"),
            lastfm_username: env_or_default("LASTFM_USERNAME"),
            spotify_client_id: env_or_default("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: env_or_default("SPOTIFY_CLIENT_SECRET"),
            cache_timeout,
            cache_file,
        }
    }

    /// Freshness threshold as a `Duration`
    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.cache_timeout)
    }
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

/// Load a `.env` file from the working directory into the process
/// environment. Variables that are already set win over file values.
pub fn load_env_file() {
    let cwd = std::env::current_dir().unwrap_or_default();
    apply_env_file(&cwd.join(".env"));
}

fn apply_env_file(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for (key, value) in parse_env_file(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(&key, &value);
        }
    }
}

/// Parse `.env` content into key/value pairs.
/// Lines are `KEY=value`; `#` lines and blanks are skipped, surrounding
/// quotes on values are trimmed.
fn parse_env_file(content: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !key.is_empty() {
                vars.push((key.to_string(), value.to_string()));
            }
        }
    }

    vars
}

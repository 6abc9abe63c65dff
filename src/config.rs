use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub data_folder: Option<PathBuf>,

    // Forum
    pub forum_base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub posts_per_page: usize,
    pub max_history_pages: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Storage
            data_folder: optional_env("DATA_FOLDER").map(PathBuf::from),

            // Forum
            forum_base_url: env_or_default("FORUM_BASE_URL", "https://bitcointalk.org/index.php"),
            user_agent: env_or_default("USER_AGENT", &default_user_agent()),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),
            request_delay: Duration::from_millis(parse_env_u64("REQUEST_DELAY_MS", 1000)?),
            posts_per_page: parse_env_usize("POSTS_PER_PAGE", 20)?,
            max_history_pages: parse_env_usize("MAX_HISTORY_PAGES", 100)?,
        })
    }

    /// Configuration for tests: no politeness delay, short timeout.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            data_folder: None,
            forum_base_url: "http://127.0.0.1/index.php".to_string(),
            user_agent: default_user_agent(),
            request_timeout: Duration::from_secs(5),
            request_delay: Duration::ZERO,
            posts_per_page: 20,
            max_history_pages: 10,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forum_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.posts_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                name: "POSTS_PER_PAGE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_history_pages == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_HISTORY_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_user_agent() -> String {
    format!("campaign-tracker/{}", env!("CARGO_PKG_VERSION"))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

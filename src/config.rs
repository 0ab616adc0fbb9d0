use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{DEFAULT_PAGE_SIZE, DEFAULT_TAGS, MAX_PAGE_SIZE};

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
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Remote API
    pub site_url: String,
    pub relay_enabled: bool,
    pub relay_url: String,
    pub http_timeout: Duration,

    // Feed
    pub default_tags: String,
    pub page_size: u32,

    // Fetch retries
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,

    // Credentials
    pub auth_store_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Remote API
            site_url: env_or_default("SITE_URL", "https://e621.net")
                .trim_end_matches('/')
                .to_string(),
            relay_enabled: parse_env_bool("RELAY_ENABLED", true)?,
            relay_url: env_or_default("RELAY_URL", "https://api.allorigins.win/get"),
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),

            // Feed
            default_tags: env_or_default("DEFAULT_TAGS", DEFAULT_TAGS),
            page_size: parse_env_u32("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,

            // Fetch retries
            retry_max_attempts: parse_env_u32("FETCH_RETRY_ATTEMPTS", 3)?,
            retry_base_delay: Duration::from_millis(parse_env_u64("FETCH_RETRY_BASE_MS", 500)?),
            retry_max_delay: Duration::from_millis(parse_env_u64("FETCH_RETRY_MAX_MS", 8000)?),

            // Credentials
            auth_store_path: PathBuf::from(env_or_default("AUTH_STORE_PATH", "./data/auth.json")),
        })
    }

    /// Configuration with defaults and no retries, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            site_url: "http://127.0.0.1:9".to_string(),
            relay_enabled: false,
            relay_url: String::new(),
            http_timeout: Duration::from_secs(5),
            default_tags: DEFAULT_TAGS.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            retry_max_attempts: 1,
            retry_base_delay: Duration::ZERO,
            retry_max_delay: Duration::ZERO,
            auth_store_path: PathBuf::from("./data/test-auth.json"),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "SITE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if url::Url::parse(&self.site_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "SITE_URL".to_string(),
                message: format!("not a valid URL: '{}'", self.site_url),
            });
        }
        if self.relay_enabled && self.relay_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "RELAY_URL".to_string(),
                message: "cannot be empty while RELAY_ENABLED is set".to_string(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                name: "PAGE_SIZE".to_string(),
                message: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_RETRY_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.default_tags.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "DEFAULT_TAGS".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
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

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("E621_FEED_NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("E621_FEED_NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_parse_int_default() {
        assert_eq!(parse_env_u32("E621_FEED_NONEXISTENT_VAR", 20).unwrap(), 20);
        assert_eq!(parse_env_u64("E621_FEED_NONEXISTENT_VAR", 30).unwrap(), 30);
    }

    #[test]
    fn test_testing_config_is_valid() {
        assert!(Config::for_testing().validate().is_ok());
    }

    #[test]
    fn test_validate_page_size_bounds() {
        let mut config = Config::for_testing();
        config.page_size = 0;
        assert!(config.validate().is_err());
        config.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.page_size = MAX_PAGE_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_relay_requires_url() {
        let config = Config {
            relay_enabled: true,
            relay_url: String::new(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_retry_attempts() {
        let config = Config {
            retry_max_attempts: 0,
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }
}

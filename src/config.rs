//! # Configuration Module
//!
//! Runtime configuration for the lyrics bot. Credentials and the privileged
//! user list come from the environment (optionally via a `.env` file); the
//! media and recovery knobs carry sensible defaults.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// Defaults for session handling
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;
pub const DEFAULT_SESSION_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

// Defaults for media ingestion
pub const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for uploaded images
pub const IMGUR_UPLOAD_URL: &str = "https://api.imgur.com/3/upload";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Recovery configuration for calls to the image host
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single HTTP request in seconds
    pub request_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            request_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Configuration for fetching chat attachments and re-hosting them
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Client id sent to the image host
    pub imgur_client_id: String,
    /// Upload endpoint of the image host
    pub upload_url: String,
    /// Maximum accepted image size in bytes
    pub max_image_size: u64,
    pub recovery: RecoveryConfig,
}

impl MediaConfig {
    pub fn new(imgur_client_id: impl Into<String>) -> Self {
        Self {
            imgur_client_id: imgur_client_id.into(),
            upload_url: IMGUR_UPLOAD_URL.to_string(),
            max_image_size: MAX_IMAGE_SIZE,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Session store tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions untouched for longer than this are treated as abandoned
    pub idle_timeout: Duration,
    /// How often the background sweeper evicts abandoned sessions
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub admin_ids: HashSet<u64>,
    pub session: SessionConfig,
    pub media: MediaConfig,
    /// Directory holding a `main.ftl` that replaces the built-in messages
    pub locales_dir: Option<PathBuf>,
    pub json_logs: bool,
}

impl BotConfig {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let database_url = required("DATABASE_URL")?;
        let imgur_client_id = required("IMGUR_CLIENT_ID")?;

        let admin_ids = match lookup("ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => HashSet::new(),
        };

        let idle_timeout = parse_u64(
            "SESSION_IDLE_TIMEOUT_SECS",
            lookup("SESSION_IDLE_TIMEOUT_SECS"),
            DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
        )?;
        let sweep_interval = parse_u64(
            "SESSION_SWEEP_INTERVAL_SECS",
            lookup("SESSION_SWEEP_INTERVAL_SECS"),
            DEFAULT_SESSION_SWEEP_INTERVAL_SECS,
        )?;
        let database_max_connections = parse_u64(
            "DATABASE_MAX_CONNECTIONS",
            lookup("DATABASE_MAX_CONNECTIONS"),
            u64::from(DEFAULT_DATABASE_MAX_CONNECTIONS),
        )?;

        let locales_dir = lookup("LOCALES_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        let json_logs = lookup("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            bot_token,
            database_url,
            database_max_connections: u32::try_from(database_max_connections).map_err(|e| {
                ConfigError::Invalid {
                    name: "DATABASE_MAX_CONNECTIONS",
                    value: database_max_connections.to_string(),
                    reason: e.to_string(),
                }
            })?,
            admin_ids,
            session: SessionConfig {
                idle_timeout: Duration::from_secs(idle_timeout),
                sweep_interval: Duration::from_secs(sweep_interval.max(1)),
            },
            media: MediaConfig::new(imgur_client_id),
            locales_dir,
            json_logs,
        })
    }
}

/// Parse a comma-separated list of Telegram user ids
pub fn parse_admin_ids(raw: &str) -> Result<HashSet<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "ADMIN_IDS",
                value: part.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn parse_u64(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name,
                value,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("DATABASE_URL", "postgres://localhost/lyrics"),
        ("IMGUR_CLIENT_ID", "client"),
    ];

    #[test]
    fn test_parse_admin_ids() {
        let ids = parse_admin_ids("547900737, 1237680623,,").unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&547900737));
        assert!(ids.contains(&1237680623));

        assert!(parse_admin_ids("12,abc").is_err());
        assert!(parse_admin_ids("").unwrap().is_empty());
    }

    #[test]
    fn test_defaults_applied() {
        let config = BotConfig::from_lookup(lookup_from(&BASE)).unwrap();
        assert!(config.admin_ids.is_empty());
        assert_eq!(
            config.session.idle_timeout,
            Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS)
        );
        assert_eq!(config.database_max_connections, DEFAULT_DATABASE_MAX_CONNECTIONS);
        assert_eq!(config.media.upload_url, IMGUR_UPLOAD_URL);
        assert_eq!(config.locales_dir, None);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_missing_token_is_reported() {
        let err = BotConfig::from_lookup(lookup_from(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.push(("ADMIN_IDS", "42"));
        pairs.push(("SESSION_IDLE_TIMEOUT_SECS", "90"));
        pairs.push(("LOG_FORMAT", "JSON"));
        pairs.push(("LOCALES_DIR", "./locales/en"));
        let config = BotConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.admin_ids.contains(&42));
        assert_eq!(config.locales_dir, Some(PathBuf::from("./locales/en")));
        assert_eq!(config.session.idle_timeout, Duration::from_secs(90));
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SESSION_IDLE_TIMEOUT_SECS", "soon"));
        assert!(BotConfig::from_lookup(lookup_from(&pairs)).is_err());
    }
}

//! Runtime configuration read from the environment.
//!
//! Every knob has a default so an empty environment yields a usable (live,
//! keyless) configuration; only malformed values are errors. A missing API key
//! is deliberately not an error here: the live adapter reports it on every fetch.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use strum_macros::{Display, EnumString};

use crate::error::MarketError;
use crate::net::{DEFAULT_BATCH_COOLDOWN_MS, DEFAULT_BATCH_SIZE, FINNHUB_BASE_URL};

/// Selector for the env variable holding the provider.
pub const ENV_PROVIDER: &str = "MARKET_PROVIDER";
/// Finnhub API token.
pub const ENV_API_KEY: &str = "FINNHUB_KEY";
/// Polling interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "MARKET_POLL_INTERVAL_MS";
/// Number of symbols fetched per cycle.
pub const ENV_WINDOW_SIZE: &str = "MARKET_WINDOW_SIZE";
/// Persisted snapshot time-to-live in milliseconds.
pub const ENV_CACHE_TTL_MS: &str = "MARKET_CACHE_TTL_MS";
/// Concurrent requests per batch.
pub const ENV_BATCH_SIZE: &str = "MARKET_BATCH_SIZE";
/// Pause between batches in milliseconds.
pub const ENV_BATCH_COOLDOWN_MS: &str = "MARKET_BATCH_COOLDOWN_MS";
/// Directory for the persisted snapshot.
pub const ENV_CACHE_DIR: &str = "MARKET_CACHE_DIR";
/// Override for the upstream base URL.
pub const ENV_BASE_URL: &str = "MARKET_BASE_URL";

/// Default polling interval (30 s).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
/// Default snapshot time-to-live (one day).
pub const DEFAULT_CACHE_TTL_MS: u64 = 1000 * 60 * 60 * 24;

/// Which quote source adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, ValueEnum)]
#[strum(ascii_case_insensitive)]
pub enum ProviderKind {
    /// Live Finnhub HTTP provider.
    #[default]
    #[strum(to_string = "live", serialize = "finnhub")]
    #[value(alias = "finnhub")]
    Live,
    /// Synthetic generator, no network I/O.
    #[strum(to_string = "mock")]
    Mock,
}

/// Complete configuration of the synchronization layer.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Adapter selector.
    pub provider: ProviderKind,
    /// Provider-issued API token; `None` when unset or blank.
    pub api_key: Option<String>,
    /// Interval between two polling cycles.
    pub poll_interval: Duration,
    /// Symbols per cycle in windowed mode; `None` polls the full list.
    pub window_size: Option<usize>,
    /// Maximum age of a persisted snapshot that is still reused.
    pub cache_ttl: Duration,
    /// Symbols requested concurrently per batch.
    pub batch_size: usize,
    /// Pause between two batches.
    pub batch_cooldown: Duration,
    /// Directory for the persisted snapshot; `None` keeps it in memory.
    pub cache_dir: Option<PathBuf>,
    /// Upstream base URL.
    pub base_url: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            provider: ProviderKind::Live,
            api_key: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            window_size: None,
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_cooldown: Duration::from_millis(DEFAULT_BATCH_COOLDOWN_MS),
            cache_dir: None,
            base_url: FINNHUB_BASE_URL.to_string(),
        }
    }
}

impl MarketConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, MarketError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (environment, map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarketError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match value(ENV_PROVIDER) {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|_| {
                MarketError::Config(format!("{} must be live or mock, got {}", ENV_PROVIDER, raw))
            })?,
            None => defaults.provider,
        };

        let poll_interval = match value(ENV_POLL_INTERVAL_MS) {
            Some(raw) => Duration::from_millis(parse_number(ENV_POLL_INTERVAL_MS, &raw)?),
            None => defaults.poll_interval,
        };
        let cache_ttl = match value(ENV_CACHE_TTL_MS) {
            Some(raw) => Duration::from_millis(parse_number(ENV_CACHE_TTL_MS, &raw)?),
            None => defaults.cache_ttl,
        };
        let batch_cooldown = match value(ENV_BATCH_COOLDOWN_MS) {
            Some(raw) => Duration::from_millis(parse_number(ENV_BATCH_COOLDOWN_MS, &raw)?),
            None => defaults.batch_cooldown,
        };
        let batch_size = match value(ENV_BATCH_SIZE) {
            Some(raw) => parse_number(ENV_BATCH_SIZE, &raw)? as usize,
            None => defaults.batch_size,
        };
        let window_size = match value(ENV_WINDOW_SIZE) {
            Some(raw) => Some(parse_number(ENV_WINDOW_SIZE, &raw)? as usize).filter(|w| *w > 0),
            None => None,
        };

        let config = MarketConfig {
            provider,
            api_key: value(ENV_API_KEY),
            poll_interval,
            window_size,
            cache_ttl,
            batch_size,
            batch_cooldown,
            cache_dir: value(ENV_CACHE_DIR).map(PathBuf::from),
            base_url: value(ENV_BASE_URL).unwrap_or(defaults.base_url),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the synchronizer relies on.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.poll_interval.is_zero() {
            return Err(MarketError::Config(format!(
                "{} must be greater than 0",
                ENV_POLL_INTERVAL_MS
            )));
        }
        if self.batch_size == 0 {
            return Err(MarketError::Config(format!(
                "{} must be greater than 0",
                ENV_BATCH_SIZE
            )));
        }
        Ok(())
    }

    /// Whether the live provider is selected but cannot authenticate.
    pub fn is_missing_credential(&self) -> bool {
        self.provider == ProviderKind::Live && self.api_key.is_none()
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, MarketError> {
    raw.parse::<u64>()
        .map_err(|e| MarketError::Config(format!("{} is not a number ({}): {}", key, raw, e)))
}

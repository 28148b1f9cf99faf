//! Command-line arguments for the market dashboard.
//!
//! Every flag is optional and overrides the matching environment variable read
//! by `MarketConfig::from_env`. See `main` for end-to-end usage.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use market_common::{MarketConfig, ProviderKind};
use market_common::net::NEWS_DAYS_BACK;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Quote provider to poll.
    #[clap(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Polling interval in milliseconds.
    #[clap(long)]
    pub interval_ms: Option<u64>,

    /// Number of symbols fetched per cycle; 0 fetches the whole list.
    #[clap(long)]
    pub window: Option<usize>,

    /// Directory where the last snapshot is persisted between runs.
    #[clap(long)]
    pub cache_dir: Option<String>,

    /// Path to a text file with symbols to poll.
    /// Symbols may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub tickers_file: Option<String>,

    /// Show the detail view for one symbol: its quote and recent news.
    #[clap(long)]
    pub symbol: Option<String>,

    /// How many days of news the detail view covers.
    #[clap(long, default_value_t = NEWS_DAYS_BACK)]
    pub news_days: i64,
}

impl Args {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut MarketConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(ms) = self.interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(window) = self.window {
            config.window_size = Some(window).filter(|w| *w > 0);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(normalize_path(dir));
        }
    }

    /// Tickers file path with surrounding quotes removed.
    pub fn tickers_path(&self) -> Option<PathBuf> {
        self.tickers_file.as_deref().map(normalize_path)
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let args = Args::parse_from([
            "market_dashboard",
            "--provider",
            "mock",
            "--interval-ms",
            "500",
            "--window",
            "4",
            "--cache-dir",
            "\"/tmp/market cache\"",
        ]);
        let mut config = MarketConfig::default();
        args.apply(&mut config);

        assert_eq!(config.provider, ProviderKind::Mock);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.window_size, Some(4));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/market cache")));
        assert_eq!(args.news_days, NEWS_DAYS_BACK);
    }

    #[test]
    fn absent_flags_keep_config() {
        let args = Args::parse_from(["market_dashboard", "--provider", "finnhub"]);
        let mut config = MarketConfig {
            window_size: Some(3),
            ..MarketConfig::default()
        };
        args.apply(&mut config);
        assert_eq!(config.provider, ProviderKind::Live);
        assert_eq!(config.window_size, Some(3));
        assert!(args.tickers_path().is_none());
    }

    #[test]
    fn zero_window_disables_windowing() {
        let args = Args::parse_from(["market_dashboard", "--window", "0"]);
        let mut config = MarketConfig {
            window_size: Some(3),
            ..MarketConfig::default()
        };
        args.apply(&mut config);
        assert_eq!(config.window_size, None);
    }
}

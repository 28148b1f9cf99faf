//! Upstream endpoints and request-shaping constants.

/// Base URL of the Finnhub REST API.
pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";
/// Provider identifier carried on live snapshots.
pub const FINNHUB_PROVIDER: &str = "finnhub";
/// Provider identifier carried on synthetic snapshots.
pub const MOCK_PROVIDER: &str = "mock";

/// Symbols requested concurrently within one batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Pause between two batches, in milliseconds.
pub const DEFAULT_BATCH_COOLDOWN_MS: u64 = 250;
/// Maximum number of headlines kept per symbol.
pub const NEWS_LIMIT: usize = 20;
/// Default look-back for company news, in days.
pub const NEWS_DAYS_BACK: i64 = 7;

/// Helper to build an endpoint URL like "base/path".
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

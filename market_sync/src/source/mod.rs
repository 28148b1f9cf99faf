//! Quote source adapters.
//!
//! An adapter turns one upstream provider's responses into canonical
//! [`Snapshot`]s. Two interchangeable implementations exist:
//! - `finnhub` — live HTTP provider, batched and rate limited.
//! - `mock` — synthetic, deterministic generator with no I/O.
//!
//! The adapter is chosen once from [`ProviderKind`] by [`source_for`].

use market_common::{MarketConfig, ProviderKind, Result, Snapshot};

use crate::cancel::CancelToken;

pub mod finnhub;
pub mod mock;

pub use finnhub::FinnhubSource;
pub use mock::MockSource;

/// Capability implemented by every quote provider.
pub trait QuoteSource: Send + Sync {
    /// Identifier carried on the snapshots this source produces.
    fn provider(&self) -> &str;

    /// Fetch quotes for `symbols`.
    ///
    /// Ordinary upstream failures (missing credential, rejected credential,
    /// rate limiting, transport errors) are returned as `Ok` snapshots with no
    /// quotes and `error` set. `Err` is reserved for cancellation and
    /// unexpected internal failures; a cancelled fetch produces no quotes.
    fn fetch(&self, symbols: &[String], cancel: &CancelToken) -> Result<Snapshot>;
}

/// Build the adapter selected by `config.provider`.
pub fn source_for(config: &MarketConfig) -> Result<Box<dyn QuoteSource>> {
    Ok(match config.provider {
        ProviderKind::Live => Box::new(FinnhubSource::from_config(config)?),
        ProviderKind::Mock => Box::new(MockSource::new()),
    })
}

//! Snapshot fetcher: the boundary past which no fetch failure is an `Err`.
//!
//! Wraps the one active [`QuoteSource`] and converts anything the adapter
//! returns as an error (cancellation included) into an empty snapshot tagged
//! with the message, the current time and the provider identifier.

use log::{debug, warn};
use market_common::{MarketConfig, Result, Snapshot};

use crate::cancel::CancelToken;
use crate::source::{QuoteSource, source_for};

/// Uniform entry point for obtaining snapshots.
pub struct SnapshotFetcher {
    source: Box<dyn QuoteSource>,
}

impl SnapshotFetcher {
    /// Wrap an already constructed source.
    pub fn new(source: Box<dyn QuoteSource>) -> Self {
        Self { source }
    }

    /// Select and build the source named by `config.provider`.
    pub fn from_config(config: &MarketConfig) -> Result<Self> {
        Ok(Self::new(source_for(config)?))
    }

    /// Identifier of the active provider.
    pub fn provider(&self) -> &str {
        self.source.provider()
    }

    /// Fetch `symbols`, always producing a snapshot.
    pub fn fetch(&self, symbols: &[String], cancel: &CancelToken) -> Snapshot {
        if symbols.is_empty() {
            return Snapshot::new(Vec::new(), chrono::Utc::now(), self.provider());
        }
        match self.source.fetch(symbols, cancel) {
            Ok(snapshot) => {
                match &snapshot.error {
                    Some(error) => warn!("{} returned an error: {}", self.provider(), error),
                    None => debug!(
                        "{} returned {} quotes",
                        self.provider(),
                        snapshot.quotes.len()
                    ),
                }
                snapshot
            }
            Err(e) => {
                warn!("{} fetch failed: {}", self.provider(), e);
                Snapshot::failed(self.provider(), e.to_string())
            }
        }
    }
}

//! Synthetic quote source for tests and offline development.
//!
//! Every call advances an internal phase by `PHASE_STEP`; each symbol's price is
//! a sine wave of that phase offset by the symbol's position in the request, so
//! consecutive fetches differ but the sequence is fully reproducible:
//!
//! - `previous_close = 100 + 0.5 * i`
//! - `price = previous_close * (1 + sin(phase + 0.4 * i) * 1.5 / 100)`
//!
//! The source never fails and performs no I/O.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::debug;
use market_common::net::MOCK_PROVIDER;
use market_common::{Quote, Result, Snapshot};

use crate::cancel::CancelToken;
use crate::source::QuoteSource;

/// Phase advance per fetch.
const PHASE_STEP: f64 = 0.25;
/// Peak amplitude of the synthetic move, in percent.
const AMPLITUDE_PCT: f64 = 1.5;

/// Deterministic generator keyed on a call counter and symbol index.
#[derive(Debug, Default)]
pub struct MockSource {
    calls: AtomicU64,
}

impl MockSource {
    /// Create a generator at phase zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Price pair for the symbol at `index` at the given `phase`.
    pub fn prices_at(phase: f64, index: usize) -> (f64, f64) {
        let i = index as f64;
        let previous_close = 100.0 + i * 0.5;
        let price = previous_close * (1.0 + (phase + i * 0.4).sin() * AMPLITUDE_PCT / 100.0);
        (price, previous_close)
    }
}

impl QuoteSource for MockSource {
    fn provider(&self) -> &str {
        MOCK_PROVIDER
    }

    fn fetch(&self, symbols: &[String], _cancel: &CancelToken) -> Result<Snapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let phase = call as f64 * PHASE_STEP;
        let now = Utc::now();

        let quotes = symbols.iter().enumerate().map(|(i, symbol)| {
            let (price, previous_close) = Self::prices_at(phase, i);
            Quote::new(symbol.clone(), price, previous_close, now)
        });
        let snapshot = Snapshot::new(quotes, now, MOCK_PROVIDER);
        debug!("Mock source generated {} quotes at phase {}", snapshot.quotes.len(), phase);
        Ok(snapshot)
    }
}

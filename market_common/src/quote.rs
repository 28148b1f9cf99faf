//! Quote and snapshot data model.
//!
//! A `Quote` is the canonical per-symbol record every provider is normalized into.
//! A `Snapshot` bundles the quotes of one fetch together with the time it was
//! assembled, the provider that produced it and an optional diagnostic message.
//! Snapshots are values: they are never mutated in place, new ones are produced
//! by [`merge`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Market quote for a single ticker symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol, unique key within a snapshot.
    pub symbol: String,
    /// Current price.
    pub price: f64,
    /// Close of the previous session.
    pub previous_close: f64,
    /// Move against the previous close, in percent.
    pub percent_change: f64,
    /// Time the provider observed the price.
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote, deriving `percent_change` from the two prices.
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        previous_close: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Quote {
            symbol: symbol.into(),
            price,
            previous_close,
            percent_change: percent_change(price, previous_close),
            observed_at,
        }
    }

    /// Whether the symbol traded above its previous close.
    pub fn is_up(&self) -> bool {
        self.percent_change > 0.0
    }
}

/// `(price - previous_close) / previous_close * 100`, or `0` when the
/// previous close is zero or the result is not finite.
pub fn percent_change(price: f64, previous_close: f64) -> f64 {
    if previous_close == 0.0 {
        return 0.0;
    }
    let change = (price - previous_close) / previous_close * 100.0;
    if change.is_finite() { change } else { 0.0 }
}

/// Point-in-time bundle of quotes plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Quotes keyed by symbol.
    pub quotes: HashMap<String, Quote>,
    /// Time the snapshot was assembled.
    pub as_of: DateTime<Utc>,
    /// Identifier of the provider that produced it (`finnhub`, `mock`, ...).
    pub provider: String,
    /// Diagnostic message for a failed or degraded fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Snapshot {
    /// Build a snapshot from a list of quotes.
    pub fn new(
        quotes: impl IntoIterator<Item = Quote>,
        as_of: DateTime<Utc>,
        provider: impl Into<String>,
    ) -> Self {
        Snapshot {
            quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
            as_of,
            provider: provider.into(),
            error: None,
        }
    }

    /// Empty snapshot tagged with `error`, stamped with the current time.
    pub fn failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self::failed_at(provider, error, Utc::now())
    }

    /// Empty snapshot tagged with `error` at a given time.
    pub fn failed_at(
        provider: impl Into<String>,
        error: impl Into<String>,
        as_of: DateTime<Utc>,
    ) -> Self {
        Snapshot {
            quotes: HashMap::new(),
            as_of,
            provider: provider.into(),
            error: Some(error.into()),
        }
    }

    /// Same snapshot with `error` replaced.
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Quote for `symbol`, if known.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// The subset of `symbols` that has no quote in this snapshot, in input order.
    pub fn missing<'a>(&self, symbols: &'a [String]) -> Vec<&'a String> {
        symbols
            .iter()
            .filter(|s| !self.quotes.contains_key(s.as_str()))
            .collect()
    }

    /// A fetch that produced nothing but an error.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() && self.quotes.is_empty()
    }

    /// Age of the snapshot relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.as_of
    }

    /// Quotes sorted by symbol, for stable display.
    pub fn sorted_quotes(&self) -> Vec<&Quote> {
        let mut quotes: Vec<&Quote> = self.quotes.values().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        quotes
    }
}

/// Combine an older (possibly absent) snapshot with a newer one.
///
/// The quote map is the union of both, `newer` winning on key collision;
/// `as_of`, `provider` and `error` come from `newer`.
pub fn merge(older: Option<&Snapshot>, newer: &Snapshot) -> Snapshot {
    let Some(older) = older else {
        return newer.clone();
    };
    let mut quotes = older.quotes.clone();
    quotes.extend(
        newer
            .quotes
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.clone())),
    );
    Snapshot {
        quotes,
        as_of: newer.as_of,
        provider: newer.provider.clone(),
        error: newer.error.clone(),
    }
}

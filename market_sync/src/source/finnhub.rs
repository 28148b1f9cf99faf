//! Live Finnhub quote source.
//!
//! Symbols are requested one per HTTP call (`GET /quote?symbol=..&token=..`),
//! split into batches of `batch_size`. Calls within a batch run concurrently on
//! scoped threads; a cooldown separates consecutive batches to stay under the
//! upstream rate limit. The first failing call fails the whole fetch: the result
//! is an empty snapshot whose `error` names the failure class.
//!
//! Cancellation is checked around every batch and interrupts the cooldown. An
//! HTTP call already on the wire is not aborted; its result is dropped.

use std::io;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use market_common::net::{FINNHUB_PROVIDER, endpoint};
use market_common::{MarketConfig, MarketError, Quote, Result, Snapshot};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::source::QuoteSource;

/// Message returned when no API token is configured.
pub const MISSING_KEY_MESSAGE: &str = "Finnhub API key missing. Please set FINNHUB_KEY";

/// Classified failure of a single upstream call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// HTTP 401.
    #[error("Finnhub API key is invalid or expired. Please check FINNHUB_KEY")]
    InvalidCredential,

    /// HTTP 429.
    #[error("Rate limit exceeded. Please wait before retrying.")]
    RateLimited,

    /// Any other non-2xx status.
    #[error("HTTP {code} for {symbol}: {reason}")]
    Status {
        /// Numeric status code.
        code: u16,
        /// Canonical reason phrase.
        reason: String,
        /// Symbol of the failing call.
        symbol: String,
    },

    /// Connection, TLS or timeout failure.
    #[error("Request failed for {symbol}: {cause}")]
    Transport {
        /// Symbol of the failing call.
        symbol: String,
        /// Underlying cause.
        cause: String,
    },

    /// Body was not the expected JSON.
    #[error("Malformed response for {symbol}: {cause}")]
    Decode {
        /// Symbol of the failing call.
        symbol: String,
        /// Underlying cause.
        cause: String,
    },

    /// A request worker panicked.
    #[error("Request worker for {0} panicked")]
    Worker(String),

    /// The OS refused to start a request worker.
    #[error("Could not start request for {symbol}: {cause}")]
    Spawn {
        /// Symbol of the request that never started.
        symbol: String,
        /// Underlying cause.
        cause: String,
    },
}

/// Map a non-success status to its failure class.
pub fn classify_status(status: StatusCode, symbol: &str) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED => UpstreamError::InvalidCredential,
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited,
        other => UpstreamError::Status {
            code: other.as_u16(),
            reason: other.canonical_reason().unwrap_or("Unknown").to_string(),
            symbol: symbol.to_string(),
        },
    }
}

/// Raw `/quote` payload. Every field may be missing or null.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawQuote {
    /// Current price.
    #[serde(default)]
    pub c: Option<f64>,
    /// Previous close.
    #[serde(default)]
    pub pc: Option<f64>,
    /// Observation time, epoch seconds.
    #[serde(default)]
    pub t: Option<f64>,
}

impl RawQuote {
    /// Normalize into a `Quote`.
    ///
    /// A missing price is zero; a missing or zero previous close falls back to
    /// the price; a missing or non-positive timestamp falls back to `fetched_at`.
    pub fn into_quote(self, symbol: &str, fetched_at: DateTime<Utc>) -> Quote {
        let price = self.c.filter(|v| v.is_finite()).unwrap_or(0.0);
        let previous_close = self
            .pc
            .filter(|v| v.is_finite() && *v != 0.0)
            .unwrap_or(price);
        let observed_at = self
            .t
            .filter(|t| *t > 0.0)
            .and_then(|t| Utc.timestamp_opt(t as i64, 0).single())
            .unwrap_or(fetched_at);
        Quote::new(symbol, price, previous_close, observed_at)
    }
}

/// Batched, rate-limited Finnhub adapter.
pub struct FinnhubSource {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    batch_size: usize,
    cooldown: Duration,
}

impl FinnhubSource {
    /// Build an adapter from the shared configuration.
    pub fn from_config(config: &MarketConfig) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            &config.base_url,
            config.batch_size,
            config.batch_cooldown,
        )
    }

    /// Build an adapter against `base_url`.
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        batch_size: usize,
        cooldown: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("market_sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketError::Http(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.to_string(),
            batch_size: batch_size.max(1),
            cooldown,
        })
    }

    fn fetch_one(
        &self,
        symbol: &str,
        api_key: &str,
        fetched_at: DateTime<Utc>,
    ) -> std::result::Result<Quote, UpstreamError> {
        let url = endpoint(&self.base_url, "quote");
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", api_key)])
            .send()
            .map_err(|e| UpstreamError::Transport {
                symbol: symbol.to_string(),
                cause: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, symbol));
        }

        let raw: RawQuote = response.json().map_err(|e| UpstreamError::Decode {
            symbol: symbol.to_string(),
            cause: e.without_url().to_string(),
        })?;
        Ok(raw.into_quote(symbol, fetched_at))
    }

    fn fetch_batch(
        &self,
        batch: &[String],
        api_key: &str,
        fetched_at: DateTime<Utc>,
    ) -> std::result::Result<Vec<Quote>, UpstreamError> {
        thread::scope(|scope| -> std::result::Result<Vec<Quote>, UpstreamError> {
            let mut handles = Vec::with_capacity(batch.len());
            for symbol in batch {
                let handle = thread::Builder::new()
                    .spawn_scoped(scope, move || self.fetch_one(symbol, api_key, fetched_at))
                    .map_err(|e| spawn_failure(symbol, &e))?;
                handles.push((symbol, handle));
            }

            handles
                .into_iter()
                .map(|(symbol, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(UpstreamError::Worker(symbol.clone())))
                })
                .collect()
        })
    }
}

fn spawn_failure(symbol: &str, cause: &io::Error) -> UpstreamError {
    UpstreamError::Spawn {
        symbol: symbol.to_string(),
        cause: cause.to_string(),
    }
}

impl QuoteSource for FinnhubSource {
    fn provider(&self) -> &str {
        FINNHUB_PROVIDER
    }

    fn fetch(&self, symbols: &[String], cancel: &CancelToken) -> Result<Snapshot> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Snapshot::failed(FINNHUB_PROVIDER, MISSING_KEY_MESSAGE));
        };

        let fetched_at = Utc::now();
        let batches: Vec<&[String]> = symbols.chunks(self.batch_size).collect();
        let mut quotes = Vec::with_capacity(symbols.len());

        for (index, batch) in batches.iter().enumerate() {
            cancel.check()?;
            debug!("Requesting batch {}/{}: {:?}", index + 1, batches.len(), batch);

            match self.fetch_batch(batch, api_key, fetched_at) {
                Ok(batch_quotes) => quotes.extend(batch_quotes),
                Err(failure) => {
                    cancel.check()?;
                    warn!("Finnhub fetch failed: {}", failure);
                    return Ok(Snapshot::failed(FINNHUB_PROVIDER, failure.to_string()));
                }
            }

            cancel.check()?;
            if index + 1 < batches.len() {
                cancel.sleep(self.cooldown)?;
            }
        }

        Ok(Snapshot::new(quotes, Utc::now(), FINNHUB_PROVIDER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_statuses() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, "MSFT"),
            UpstreamError::InvalidCredential
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "MSFT"),
            UpstreamError::RateLimited
        );
        let other = classify_status(StatusCode::BAD_GATEWAY, "MSFT");
        assert_eq!(other.to_string(), "HTTP 502 for MSFT: Bad Gateway");
    }

    #[test]
    fn refused_worker_becomes_failure_value() {
        let cause = io::Error::new(io::ErrorKind::WouldBlock, "Resource temporarily unavailable");
        let failure = spawn_failure("MSFT", &cause);
        assert_eq!(
            failure.to_string(),
            "Could not start request for MSFT: Resource temporarily unavailable"
        );
    }

    #[test]
    fn raw_quote_defaults_missing_fields() {
        let fetched_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let quote = RawQuote::default().into_quote("NONE", fetched_at);
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.previous_close, 0.0);
        assert_eq!(quote.percent_change, 0.0);
        assert_eq!(quote.observed_at, fetched_at);
    }

    #[test]
    fn raw_quote_uses_upstream_timestamp_and_previous_close() {
        let fetched_at = Utc::now();
        let raw: RawQuote =
            serde_json::from_str(r#"{"c": 105.0, "pc": 100.0, "t": 1700000000, "d": 5}"#).unwrap();
        let quote = raw.into_quote("MSFT", fetched_at);
        assert_eq!(quote.symbol, "MSFT");
        assert!((quote.percent_change - 5.0).abs() < 1e-9);
        assert_eq!(quote.observed_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn zero_previous_close_falls_back_to_price() {
        let raw: RawQuote = serde_json::from_str(r#"{"c": 42.0, "pc": 0, "t": 0}"#).unwrap();
        let quote = raw.into_quote("X", Utc::now());
        assert_eq!(quote.previous_close, 42.0);
        assert_eq!(quote.percent_change, 0.0);
    }

    #[test]
    fn missing_key_fails_without_network() {
        let source =
            FinnhubSource::new(None, "http://127.0.0.1:9", 10, Duration::from_millis(250)).unwrap();
        let symbols = vec!["MSFT".to_string(), "NVDA".to_string()];
        let snapshot = source.fetch(&symbols, &CancelToken::new()).unwrap();
        assert!(snapshot.is_failure());
        assert_eq!(snapshot.provider, "finnhub");
        assert_eq!(snapshot.error.as_deref(), Some(MISSING_KEY_MESSAGE));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let source = FinnhubSource::new(Some("  ".into()), "http://127.0.0.1:9", 10, Duration::ZERO)
            .unwrap();
        let snapshot = source.fetch(&["A".to_string()], &CancelToken::new()).unwrap();
        assert_eq!(snapshot.error.as_deref(), Some(MISSING_KEY_MESSAGE));
    }

    #[test]
    fn cancelled_token_stops_before_first_batch() {
        let source =
            FinnhubSource::new(Some("key".into()), "http://127.0.0.1:9", 10, Duration::ZERO).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = source.fetch(&["A".to_string()], &cancel);
        assert!(matches!(result, Err(MarketError::Cancelled)));
    }
}

//!
//! Common types and utilities shared by the market synchronizer and the dashboard.
//!
//! This crate aggregates:
//! - `error` — unified error type `MarketError` used across the workspace.
//! - `result` — handy `Result<T, MarketError>` alias.
//! - `quote` — `Quote`/`Snapshot` data model and the snapshot merge.
//! - `config` — environment-driven configuration and the provider selector.
//! - `tickers` — the dashboard ticker list and symbol-file parsing.
//! - `net` — upstream endpoints and request-shaping constants.
//! - `stats` — aggregate statistics (average move, breadth, extremes).
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod stats;
pub mod tickers;

pub use config::{MarketConfig, ProviderKind};
pub use error::MarketError;
pub use quote::{Quote, Snapshot, merge};
pub use result::Result;

//!
//! Market snapshot synchronization.
//!
//! Leaf to root:
//! - `source` — quote source adapters (live Finnhub, synthetic mock).
//! - `fetcher` — wraps the active adapter so every fetch ends as a `Snapshot`.
//! - `cancel` — cooperative cancellation token shared with fetch workers.
//! - `sync` — polling subscription: timer, cancel-and-restart, windowing, merge.
//! - `store` — shared, persisted snapshot with TTL and on-demand `ensure`.
//! - `news` — company headlines client.
#![warn(missing_docs)]
pub mod cancel;
pub mod fetcher;
pub mod news;
pub mod source;
pub mod store;
pub mod sync;

pub use cancel::CancelToken;
pub use fetcher::SnapshotFetcher;
pub use source::{FinnhubSource, MockSource, QuoteSource};
pub use store::{MarketView, SnapshotStore};
pub use sync::{PollOptions, Subscription, SyncState};

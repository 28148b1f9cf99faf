//! Shared snapshot store.
//!
//! One `SnapshotStore` is built at start-up, wrapped in an `Arc` and handed to
//! every consumer. It holds the authoritative merged snapshot, persists it after
//! each merge, and broadcasts a fresh [`MarketView`] to subscribers whenever the
//! snapshot or the primary subscription's loading/error status changes. The primary polling
//! subscription (see [`SnapshotStore::attach_primary`]) is its writer of record;
//! [`SnapshotStore::ensure`] lets secondary views pull symbols the primary list
//! does not cover through the same merge path.
//!
//! Persistence is best effort: every backend or serialization error is logged
//! and dropped, never surfaced to readers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use market_common::{Quote, Result, Snapshot, merge};

use crate::cancel::CancelToken;
use crate::fetcher::SnapshotFetcher;
use crate::sync::{PollOptions, Subscription};

pub mod persist;

pub use persist::{
    CACHE_KEY, FilePersistence, MemoryPersistence, SnapshotPersistence, persistence_for,
};

/// Uniform read model for views.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketView {
    /// Merged snapshot, `None` until something is known.
    pub snapshot: Option<Snapshot>,
    /// The primary subscription is still on its first cycle and nothing is cached.
    pub loading: bool,
    /// Error of the primary subscription, else the snapshot's own error.
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct PrimaryStatus {
    loading: bool,
    error: Option<String>,
}

/// Process-wide holder of the merged snapshot.
pub struct SnapshotStore {
    snapshot: Mutex<Option<Snapshot>>,
    status: Mutex<PrimaryStatus>,
    subscribers: Mutex<Vec<Sender<MarketView>>>,
    fetcher: Arc<SnapshotFetcher>,
    persistence: Box<dyn SnapshotPersistence>,
    ttl: Duration,
}

impl SnapshotStore {
    /// Open the store, reusing a persisted snapshot younger than `ttl`.
    pub fn open(
        fetcher: Arc<SnapshotFetcher>,
        persistence: Box<dyn SnapshotPersistence>,
        ttl: Duration,
    ) -> Self {
        Self::open_at(fetcher, persistence, ttl, Utc::now())
    }

    /// Same as [`SnapshotStore::open`] with an explicit notion of "now".
    pub fn open_at(
        fetcher: Arc<SnapshotFetcher>,
        persistence: Box<dyn SnapshotPersistence>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let initial = load_persisted(persistence.as_ref(), ttl, now);
        Self {
            snapshot: Mutex::new(initial),
            status: Mutex::new(PrimaryStatus::default()),
            subscribers: Mutex::new(Vec::new()),
            fetcher,
            persistence,
            ttl,
        }
    }

    /// Configured time-to-live of the persisted snapshot.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetcher used for on-demand requests.
    pub fn fetcher(&self) -> &Arc<SnapshotFetcher> {
        &self.fetcher
    }

    /// Current merged snapshot.
    pub fn read(&self) -> Option<Snapshot> {
        lock(&self.snapshot).clone()
    }

    /// Quote for one symbol from the current snapshot.
    pub fn quote(&self, symbol: &str) -> Option<Quote> {
        lock(&self.snapshot)
            .as_ref()
            .and_then(|s| s.get(symbol).cloned())
    }

    /// Snapshot plus the loading/error flags views display.
    pub fn view(&self) -> MarketView {
        let snapshot = self.read();
        let status = lock(&self.status);
        MarketView {
            loading: status.loading && snapshot.is_none(),
            error: status
                .error
                .clone()
                .or_else(|| snapshot.as_ref().and_then(|s| s.error.clone())),
            snapshot,
        }
    }

    /// Merge `partial` into the held snapshot, persist and broadcast it.
    ///
    /// Merging something that leaves the snapshot unchanged is a no-op.
    pub fn merge(&self, partial: &Snapshot) {
        if self.apply(partial) {
            self.broadcast();
        }
    }

    fn apply(&self, partial: &Snapshot) -> bool {
        let mut current = lock(&self.snapshot);
        let merged = merge(current.as_ref(), partial);
        if current.as_ref() == Some(&merged) {
            return false;
        }
        self.persist(&merged);
        debug!(
            "Store now holds {} quotes from {}",
            merged.quotes.len(),
            merged.provider
        );
        *current = Some(merged);
        true
    }

    fn broadcast(&self) {
        let mut subscribers = lock(&self.subscribers);
        if subscribers.is_empty() {
            return;
        }
        let view = self.view();
        subscribers.retain(|tx| tx.send(view.clone()).is_ok());
    }

    /// Fetch the symbols the snapshot does not have yet and merge them.
    ///
    /// Failed fetches are logged and ignored. Concurrent calls for the same
    /// symbols are not coalesced.
    pub fn ensure(&self, symbols: &[String]) {
        let missing: Vec<String> = match lock(&self.snapshot).as_ref() {
            Some(snapshot) => snapshot.missing(symbols).into_iter().cloned().collect(),
            None => symbols.to_vec(),
        };
        if missing.is_empty() {
            debug!("ensure: all {} symbols already known", symbols.len());
            return;
        }

        info!("Fetching {} missing symbols on demand", missing.len());
        let snapshot = self.fetcher.fetch(&missing, &CancelToken::new());
        if snapshot.is_failure() {
            warn!(
                "On-demand fetch failed: {}",
                snapshot.error.as_deref().unwrap_or_default()
            );
            return;
        }
        self.merge(&snapshot);
    }

    /// Run [`SnapshotStore::ensure`] on a background thread.
    pub fn ensure_in_background(self: &Arc<Self>, symbols: Vec<String>) -> Result<JoinHandle<()>> {
        let store = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("market-ensure".to_string())
            .spawn(move || store.ensure(&symbols))?;
        Ok(handle)
    }

    /// Receive the view after every change from now on.
    pub fn subscribe(&self) -> Receiver<MarketView> {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Start the primary polling subscription feeding this store.
    ///
    /// A snapshot the subscription already handed over is not merged again, so
    /// failed cycles and loading toggles only update the status.
    pub fn attach_primary(self: &Arc<Self>, options: PollOptions) -> Result<Subscription> {
        if self.record_status(true, None) {
            self.broadcast();
        }
        let store = Arc::clone(self);
        let last_merged: Mutex<Option<Snapshot>> = Mutex::new(None);
        Subscription::start(Arc::clone(&self.fetcher), options, move |state| {
            let mut changed = false;
            if let Some(snapshot) = &state.snapshot {
                let mut last = lock(&last_merged);
                if last.as_ref() != Some(snapshot) {
                    changed |= store.apply(snapshot);
                    *last = Some(snapshot.clone());
                }
            }
            changed |= store.record_status(state.loading, state.error.clone());
            if changed {
                store.broadcast();
            }
        })
    }

    fn record_status(&self, loading: bool, error: Option<String>) -> bool {
        let mut status = lock(&self.status);
        if status.loading == loading && status.error == error {
            return false;
        }
        status.loading = loading;
        status.error = error;
        true
    }

    fn persist(&self, snapshot: &Snapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(Into::into)
            .and_then(|json| self.persistence.save(CACHE_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist snapshot: {}", e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn load_persisted(
    persistence: &dyn SnapshotPersistence,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Option<Snapshot> {
    let raw = match persistence.load(CACHE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read persisted snapshot: {}", e);
            return None;
        }
    };

    let snapshot: Snapshot = match serde_json::from_str(&raw) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Discarding unreadable persisted snapshot: {}", e);
            return None;
        }
    };

    let age = snapshot.age(now).to_std().unwrap_or(Duration::ZERO);
    if age > ttl {
        info!("Discarding persisted snapshot from {} (older than {:?})", snapshot.as_of, ttl);
        if let Err(e) = persistence.remove(CACHE_KEY) {
            warn!("Failed to remove expired snapshot: {}", e);
        }
        return None;
    }

    info!(
        "Restored {} quotes persisted at {}",
        snapshot.quotes.len(),
        snapshot.as_of
    );
    Some(snapshot)
}

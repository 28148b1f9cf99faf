//! Polling synchronizer.
//!
//! A [`Subscription`] owns one loop thread that multiplexes three channels with
//! crossbeam `select!`:
//! - control messages from the owner (`refresh`, reconfiguration, stop),
//! - the interval ticker,
//! - results of fetch cycles.
//!
//! Every cycle runs its fetch on a short-lived worker thread and is tagged with
//! a generation number. Starting a cycle cancels the token of the one still in
//! flight, and a result is applied only if its generation is the current one, so
//! at most one fetch per subscription can ever write. All state lives on the
//! loop thread; consumers see it through `on_change` and [`Subscription::state`].
//!
//! A cycle whose snapshot is a failure (error and no quotes) keeps the held
//! snapshot, surfaces the error and does not move the polling window. Any other
//! result is merged into the held snapshot; the callback fires only when the
//! published state actually differs from the previous one.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use log::{debug, error, info, warn};
use market_common::{MarketError, Result, Snapshot, merge};

use crate::cancel::CancelToken;
use crate::fetcher::SnapshotFetcher;

pub mod window;

pub use window::PollingWindow;

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOptions {
    /// Symbols to keep fresh.
    pub symbols: Vec<String>,
    /// Delay between two cycles.
    pub interval: Duration,
    /// Symbols per cycle; `None` fetches the whole list every time.
    pub window: Option<usize>,
}

impl PollOptions {
    /// Poll the full `symbols` list every `interval`.
    pub fn new(symbols: Vec<String>, interval: Duration) -> Self {
        Self {
            symbols,
            interval,
            window: None,
        }
    }

    /// Enable windowed polling.
    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.window = window;
        self
    }
}

/// State exposed to consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Latest merged snapshot; `None` until the first successful cycle.
    pub snapshot: Option<Snapshot>,
    /// True until the first cycle after start or reconfiguration completes.
    pub loading: bool,
    /// Error reported by the most recent completed cycle.
    pub error: Option<String>,
}

enum Control {
    Refresh,
    SetSymbols(Vec<String>),
    SetInterval(Duration),
    Stop,
}

struct CycleResult {
    generation: u64,
    snapshot: Snapshot,
}

struct InFlight {
    generation: u64,
    cancel: CancelToken,
}

/// Handle to a running polling loop. Stops the loop when dropped.
pub struct Subscription {
    control_tx: Sender<Control>,
    state: Arc<Mutex<SyncState>>,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Start polling immediately, then every `options.interval`.
    ///
    /// `on_change` runs on the loop thread each time the published state
    /// changes, and never after [`Subscription::stop`] returns.
    pub fn start<F>(fetcher: Arc<SnapshotFetcher>, options: PollOptions, on_change: F) -> Result<Self>
    where
        F: Fn(&SyncState) + Send + 'static,
    {
        validate_interval(options.interval)?;

        let initial = SyncState {
            snapshot: None,
            loading: true,
            error: None,
        };
        let state = Arc::new(Mutex::new(initial.clone()));
        let (control_tx, control_rx) = unbounded::<Control>();

        let poll_loop = PollLoop {
            fetcher,
            symbols: options.symbols,
            interval: options.interval,
            window: PollingWindow::new(options.window),
            held: initial,
            published: Arc::clone(&state),
            on_change,
            generation: 0,
            in_flight: None,
        };

        let worker = thread::Builder::new()
            .name("market-poll".to_string())
            .spawn(move || poll_loop.run(control_rx))?;

        Ok(Self {
            control_tx,
            state,
            worker: Some(worker),
        })
    }

    /// Copy of the most recently published state.
    pub fn state(&self) -> SyncState {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Start a cycle now, cancelling the one in flight.
    pub fn refresh(&self) -> Result<()> {
        self.send(Control::Refresh)
    }

    /// Replace the symbol list; resets the window and restarts the cycle.
    pub fn set_symbols(&self, symbols: Vec<String>) -> Result<()> {
        self.send(Control::SetSymbols(symbols))
    }

    /// Change the interval; restarts the timer and the cycle.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        validate_interval(interval)?;
        self.send(Control::SetInterval(interval))
    }

    /// Cancel the in-flight fetch, stop the timer and join the loop thread.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // The loop may already be gone; joining is what matters.
        let _ = self.control_tx.send(Control::Stop);
        worker
            .join()
            .map_err(|_| MarketError::Thread("polling loop panicked".to_string()))
    }

    fn send(&self, control: Control) -> Result<()> {
        self.control_tx
            .send(control)
            .map_err(|e| MarketError::ChannelSend(format!("polling loop stopped: {}", e)))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop polling loop: {}", e);
        }
    }
}

fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(MarketError::Config(
            "polling interval must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

struct PollLoop<F> {
    fetcher: Arc<SnapshotFetcher>,
    symbols: Vec<String>,
    interval: Duration,
    window: PollingWindow,
    held: SyncState,
    published: Arc<Mutex<SyncState>>,
    on_change: F,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl<F> PollLoop<F>
where
    F: Fn(&SyncState) + Send + 'static,
{
    fn run(mut self, control_rx: Receiver<Control>) {
        let (result_tx, result_rx) = unbounded::<CycleResult>();
        let mut ticker = tick(self.interval);
        info!(
            "Polling {} symbols every {:?} via {}",
            self.symbols.len(),
            self.interval,
            self.fetcher.provider()
        );
        self.begin_cycle(&result_tx);

        loop {
            let mut rearm = false;
            select! {
                recv(control_rx) -> msg => match msg {
                    Ok(Control::Refresh) => self.begin_cycle(&result_tx),
                    Ok(Control::SetSymbols(symbols)) => {
                        info!("Symbol list changed to {} symbols", symbols.len());
                        self.symbols = symbols;
                        self.window.reset();
                        rearm = true;
                        self.restart(&result_tx);
                    }
                    Ok(Control::SetInterval(interval)) => {
                        info!("Polling interval changed to {:?}", interval);
                        self.interval = interval;
                        rearm = true;
                        self.restart(&result_tx);
                    }
                    Ok(Control::Stop) | Err(_) => break,
                },
                recv(ticker) -> _ => self.begin_cycle(&result_tx),
                recv(result_rx) -> msg => if let Ok(result) = msg {
                    self.complete_cycle(result);
                },
            }
            if rearm {
                ticker = tick(self.interval);
            }
        }

        self.cancel_in_flight();
        info!("Polling loop stopped");
    }

    fn restart(&mut self, result_tx: &Sender<CycleResult>) {
        let mut next = self.held.clone();
        next.loading = true;
        self.publish(next);
        self.begin_cycle(result_tx);
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Cancelling cycle {}", in_flight.generation);
            in_flight.cancel.cancel();
        }
    }

    fn begin_cycle(&mut self, result_tx: &Sender<CycleResult>) {
        self.cancel_in_flight();
        self.generation += 1;
        let generation = self.generation;

        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let symbols = self.window.slice(&self.symbols);
        let fetcher = Arc::clone(&self.fetcher);
        let tx = result_tx.clone();
        debug!("Cycle {} fetching {:?}", generation, symbols);

        let spawned = thread::Builder::new()
            .name(format!("market-fetch-{}", generation))
            .spawn(move || {
                let snapshot = fetcher.fetch(&symbols, &worker_cancel);
                // The loop is gone after teardown; nothing left to notify.
                let _ = tx.send(CycleResult {
                    generation,
                    snapshot,
                });
            });

        match spawned {
            Ok(_) => self.in_flight = Some(InFlight { generation, cancel }),
            Err(e) => {
                error!("Failed to spawn fetch worker: {}", e);
                let mut next = self.held.clone();
                next.loading = false;
                next.error = Some(format!("failed to start fetch: {}", e));
                self.publish(next);
            }
        }
    }

    fn complete_cycle(&mut self, result: CycleResult) {
        let is_current = matches!(
            &self.in_flight,
            Some(in_flight) if in_flight.generation == result.generation
        );
        if !is_current {
            debug!("Discarding result of superseded cycle {}", result.generation);
            return;
        }
        self.in_flight = None;

        let snapshot = result.snapshot;
        let mut next = self.held.clone();
        next.loading = false;
        next.error = snapshot.error.clone();

        if snapshot.is_failure() {
            warn!(
                "Cycle {} failed, keeping previous snapshot: {}",
                result.generation,
                snapshot.error.as_deref().unwrap_or_default()
            );
        } else {
            let merged = merge(self.held.snapshot.as_ref(), &snapshot);
            let moved = self
                .held
                .snapshot
                .as_ref()
                .is_none_or(|held| held.quotes != merged.quotes);
            if moved {
                next.snapshot = Some(merged);
            } else {
                debug!("Cycle {} brought no new prices", result.generation);
                if let Some(held) = next.snapshot.as_mut() {
                    held.error = snapshot.error.clone();
                }
            }
            self.window.advance(self.symbols.len());
        }

        self.publish(next);
    }

    fn publish(&mut self, next: SyncState) {
        if next == self.held {
            return;
        }
        self.held = next;
        *self.published.lock().unwrap_or_else(|p| p.into_inner()) = self.held.clone();
        (self.on_change)(&self.held);
    }
}

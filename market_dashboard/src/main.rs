//! Market Dashboard — a terminal front end for the market snapshot synchronizer.
//!
//! It restores the last persisted snapshot, starts the primary polling
//! subscription over the dashboard symbols and logs a summary every time the
//! shared store changes. With `--symbol` it also pulls that symbol into the
//! store on demand and prints its recent company news.
//!
//! Usage example (CLI):
//! ```bash
//! FINNHUB_KEY=... market_dashboard --interval-ms 15000 --window 5 --cache-dir ./cache
//! market_dashboard --provider mock --symbol IBM
//! ```
//!
//! The tickers file should contain symbols separated by commas, spaces, or new lines.
#![warn(missing_docs)]
mod args;
mod render;

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{Receiver, bounded, select};
use log::{error, info, warn};
use market_common::tickers::{DashboardTicker, SymbolList, TickerParser, normalize_symbol};
use market_common::{MarketConfig, MarketError, Result};
use market_sync::news::NewsClient;
use market_sync::store::persistence_for;
use market_sync::{MarketView, PollOptions, SnapshotFetcher, SnapshotStore};

use crate::args::Args;

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let shutdown = shutdown_signal()?;

    let mut config = MarketConfig::from_env()?;
    args.apply(&mut config);
    config.validate()?;
    if config.is_missing_credential() {
        warn!("FINNHUB_KEY is not set; live quotes will fail until it is provided");
    }

    let symbols = load_symbols(&args)?;
    info!("Tickers: {:?}", symbols);

    let fetcher = Arc::new(SnapshotFetcher::from_config(&config)?);
    let store = Arc::new(SnapshotStore::open(
        fetcher,
        persistence_for(&config),
        config.cache_ttl,
    ));
    let updates = store.subscribe();
    log_dashboard(&store.view());

    let options = PollOptions::new(symbols, config.poll_interval).with_window(config.window_size);
    let mut primary = store.attach_primary(options)?;

    let detail = match args.symbol.as_deref() {
        Some(raw) => Some(start_detail(&store, &config, raw, args.news_days)?),
        None => None,
    };

    info!("Dashboard is running. Press Ctrl+C to exit.");
    loop {
        select! {
            recv(updates) -> msg => match msg {
                Ok(view) => {
                    log_dashboard(&view);
                    if let Some(symbol) = &detail {
                        let quote = view.snapshot.as_ref().and_then(|s| s.get(symbol));
                        info!("{}", render::detail_line(symbol, quote));
                    }
                }
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }

    info!("Shutting down dashboard...");
    primary.stop()
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Channel that yields once Ctrl+C is pressed.
fn shutdown_signal() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down dashboard...");
        let _ = tx.try_send(());
    })
    .map_err(|e| MarketError::Thread(format!("failed to set Ctrl+C handler: {}", e)))?;
    Ok(rx)
}

/// Symbols from `--tickers-file`, or the built-in dashboard list.
fn load_symbols(args: &Args) -> Result<Vec<String>> {
    let Some(path) = args.tickers_path() else {
        return Ok(DashboardTicker::symbols());
    };
    let file = File::open(&path)?;
    let symbols = SymbolList::parse_from_file(BufReader::new(file))?;
    if symbols.is_empty() {
        return Err(MarketError::ParseTickersFile(format!(
            "no symbols in {}",
            path.display()
        )));
    }
    Ok(symbols)
}

/// Pull `raw` into the store and print its news in the background.
fn start_detail(
    store: &Arc<SnapshotStore>,
    config: &MarketConfig,
    raw: &str,
    news_days: i64,
) -> Result<String> {
    let symbol = normalize_symbol(raw)
        .ok_or_else(|| MarketError::Config(format!("invalid symbol: {}", raw)))?;

    if !DashboardTicker::contains(&symbol) {
        info!("{} is not on the dashboard list, fetching it on demand", symbol);
    }
    store.ensure_in_background(vec![symbol.clone()])?;

    let client = NewsClient::with_base_url(config.api_key.clone(), &config.base_url)?;
    let news_symbol = symbol.clone();
    thread::Builder::new()
        .name("market-news".to_string())
        .spawn(move || {
            let news = client.fetch_company_news(&news_symbol, news_days);
            if news.error.is_some() {
                error!("{}", render::news_lines(&news).join("\n"));
                return;
            }
            for line in render::news_lines(&news) {
                info!("{}", line);
            }
        })?;

    Ok(symbol)
}

fn log_dashboard(view: &MarketView) {
    for line in render::dashboard_lines(view) {
        info!("{}", line);
    }
}

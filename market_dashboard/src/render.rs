//! Text rendering of the dashboard and detail views.
use chrono::{DateTime, SecondsFormat, Utc};
use market_common::Quote;
use market_common::stats::MarketStats;
use market_sync::MarketView;
use market_sync::news::CompanyNews;

fn arrow(quote: &Quote) -> &'static str {
    if quote.is_up() {
        "▲"
    } else if quote.percent_change < 0.0 {
        "▼"
    } else {
        "="
    }
}

/// One table row: symbol, price, move.
pub fn quote_line(quote: &Quote) -> String {
    format!(
        "{:<6} {:>10.2} {} {:+.2}%",
        quote.symbol,
        quote.price,
        arrow(quote),
        quote.percent_change
    )
}

/// Dashboard: status header, aggregate stats and one row per symbol.
pub fn dashboard_lines(view: &MarketView) -> Vec<String> {
    let mut lines = Vec::new();
    if view.loading {
        lines.push("Loading market data...".to_string());
    }
    if let Some(error) = &view.error {
        lines.push(format!("Warning: {}", error));
    }
    let Some(snapshot) = &view.snapshot else {
        return lines;
    };

    lines.push(format!(
        "{} quotes from {} as of {}",
        snapshot.quotes.len(),
        snapshot.provider,
        timestamp(snapshot.as_of)
    ));
    let quotes = snapshot.sorted_quotes();
    if let Some(stats) = MarketStats::from_quotes(quotes.iter().copied()) {
        lines.push(format!(
            "Avg {:+.2}% | heat {:+.2} | {} up / {} down / {} flat | best {} {:+.2}% | worst {} {:+.2}%",
            stats.average_move,
            stats.heat,
            stats.advancers,
            stats.decliners,
            stats.unchanged,
            stats.best.symbol,
            stats.best.percent_change,
            stats.worst.symbol,
            stats.worst.percent_change
        ));
    }
    lines.extend(quotes.into_iter().map(quote_line));
    lines
}

/// Detail header for one symbol.
pub fn detail_line(symbol: &str, quote: Option<&Quote>) -> String {
    match quote {
        Some(quote) => format!(
            "{} | prev close {:.2} | observed {}",
            quote_line(quote),
            quote.previous_close,
            timestamp(quote.observed_at)
        ),
        None => format!("{:<6} no quote yet", symbol),
    }
}

/// Headlines of the detail view, newest first.
pub fn news_lines(news: &CompanyNews) -> Vec<String> {
    if let Some(error) = &news.error {
        return vec![format!("News for {} unavailable: {}", news.symbol, error)];
    }
    if news.items.is_empty() {
        return vec![format!("No recent news for {}", news.symbol)];
    }
    news.items
        .iter()
        .map(|item| {
            let published = DateTime::<Utc>::from_timestamp(item.datetime, 0)
                .map(timestamp)
                .unwrap_or_else(|| "unknown time".to_string());
            format!("[{}] {} ({}) {}", published, item.headline, item.source, item.url)
        })
        .collect()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

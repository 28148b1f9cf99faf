//! Aggregate statistics over a set of quotes: average move, breadth and extremes.

use crate::quote::Quote;

/// Bound applied to the average move when it is used as a "heat" gauge.
pub const HEAT_LIMIT: f64 = 5.0;

/// Summary of one snapshot's quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketStats {
    /// Number of quotes summarized.
    pub count: usize,
    /// Mean percent change.
    pub average_move: f64,
    /// Mean percent change clamped to `[-HEAT_LIMIT, HEAT_LIMIT]`.
    pub heat: f64,
    /// Quotes with a positive change.
    pub advancers: usize,
    /// Quotes with a negative change.
    pub decliners: usize,
    /// Quotes with no change.
    pub unchanged: usize,
    /// Largest percent change.
    pub best: Quote,
    /// Smallest percent change.
    pub worst: Quote,
}

impl MarketStats {
    /// Summarize `quotes`; `None` when there is nothing to summarize.
    pub fn from_quotes<'a, I>(quotes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Quote>,
    {
        let quotes: Vec<&Quote> = quotes.into_iter().collect();
        let first = *quotes.first()?;

        let mut best = first;
        let mut worst = first;
        let mut sum = 0.0;
        let (mut advancers, mut decliners, mut unchanged) = (0, 0, 0);

        for &quote in &quotes {
            sum += quote.percent_change;
            if quote.percent_change > 0.0 {
                advancers += 1;
            } else if quote.percent_change < 0.0 {
                decliners += 1;
            } else {
                unchanged += 1;
            }
            if quote.percent_change > best.percent_change {
                best = quote;
            }
            if quote.percent_change < worst.percent_change {
                worst = quote;
            }
        }

        let average_move = sum / quotes.len() as f64;
        Some(MarketStats {
            count: quotes.len(),
            average_move,
            heat: average_move.clamp(-HEAT_LIMIT, HEAT_LIMIT),
            advancers,
            decliners,
            unchanged,
            best: best.clone(),
            worst: worst.clone(),
        })
    }
}

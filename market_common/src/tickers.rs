//! Ticker symbols and helpers shared between the synchronizer and the dashboard.

use std::collections::HashSet;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::MarketError;

/// Trait providing file parsing for ticker lists.
pub trait TickerParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Symbols may be separated by commas, spaces, or new lines. Each symbol is
    /// upper-cased; duplicates are dropped while keeping the first occurrence.
    /// Returns an error on the first token that is not a valid symbol.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError>;
}

/// Parser for free-form symbol lists.
pub struct SymbolList;

impl TickerParser for SymbolList {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<String>, MarketError> {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(MarketError::Io)?;
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                match normalize_symbol(token) {
                    Some(symbol) => {
                        if seen.insert(symbol.clone()) {
                            symbols.push(symbol);
                        }
                    }
                    None => {
                        return Err(MarketError::ParseTickersFile(format!(
                            "invalid symbol: {}",
                            token
                        )));
                    }
                }
            }
        }
        Ok(symbols)
    }
}

/// Upper-case and validate a raw symbol.
///
/// Accepts ASCII letters, digits, `.` and `-` (class shares such as `BRK.B`).
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"');
    if trimmed.is_empty() || trimmed.len() > 12 {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// Symbols polled by the dashboard when no list is configured.
#[allow(missing_docs)]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    Hash,
    Eq,
    PartialEq,
)]
#[strum(ascii_case_insensitive)]
pub enum DashboardTicker {
    MSFT,
    NVDA,
    ORCL,
    AMD,
    COIN,
    HOOD,
    RIOT,
    MARA,
    MSTR,
    ARM,
    CRUS,
    RDDT,
    CCJ,
    XOM,
    NEM,
    GOLD,
    AMLP,
}

impl DashboardTicker {
    /// The full dashboard list as owned symbol strings, in display order.
    pub fn symbols() -> Vec<String> {
        Self::iter().map(|t| t.to_string()).collect()
    }

    /// Whether `symbol` belongs to the dashboard list.
    pub fn contains(symbol: &str) -> bool {
        symbol.parse::<Self>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_mixed_separators_and_dedups() {
        let input = Cursor::new("msft, nvda\n\nAMD  msft\nbrk.b\n");
        let symbols = SymbolList::parse_from_file(input).unwrap();
        assert_eq!(symbols, vec!["MSFT", "NVDA", "AMD", "BRK.B"]);
    }

    #[test]
    fn rejects_invalid_symbol() {
        let input = Cursor::new("MSFT\nNV$DA\n");
        let err = SymbolList::parse_from_file(input).unwrap_err();
        assert!(matches!(err, MarketError::ParseTickersFile(_)));
    }

    #[test]
    fn dashboard_list_round_trips_through_strings() {
        let symbols = DashboardTicker::symbols();
        assert_eq!(symbols.len(), 17);
        assert_eq!(symbols[0], "MSFT");
        assert!(DashboardTicker::contains("nvda"));
        assert!(!DashboardTicker::contains("AAPL"));
    }
}

//! Company news client.
//!
//! Fetches recent headlines for one symbol from Finnhub's `/company-news`
//! endpoint. Like the quote adapters it never returns an `Err`: failures are
//! carried on [`CompanyNews::error`] with an empty item list.

use chrono::{Duration, Utc};
use log::{debug, warn};
use market_common::net::{FINNHUB_BASE_URL, NEWS_LIMIT, endpoint};
use market_common::{MarketError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::source::finnhub::{MISSING_KEY_MESSAGE, classify_status};

/// One headline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Publication time, epoch seconds.
    #[serde(default)]
    pub datetime: i64,
    /// Headline text.
    #[serde(default)]
    pub headline: String,
    /// Publisher.
    #[serde(default)]
    pub source: String,
    /// Link to the article.
    #[serde(default)]
    pub url: String,
    /// Short abstract.
    #[serde(default)]
    pub summary: Option<String>,
    /// Illustration URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Provider category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Headlines for a symbol, or the reason there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyNews {
    /// Requested symbol.
    pub symbol: String,
    /// Newest first, at most `NEWS_LIMIT` entries.
    pub items: Vec<NewsItem>,
    /// Diagnostic message for a failed request.
    pub error: Option<String>,
}

impl CompanyNews {
    fn failed(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            items: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Drop blank headlines, sort newest first and cap at `limit`.
pub fn select_headlines(mut items: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    items.retain(|item| !item.headline.trim().is_empty());
    items.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    items.truncate(limit);
    items
}

/// Blocking client for the news endpoint.
pub struct NewsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsClient {
    /// Client against the public Finnhub API.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, FINNHUB_BASE_URL)
    }

    /// Client against `base_url`.
    pub fn with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| MarketError::Http(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.to_string(),
        })
    }

    /// Headlines for `symbol` published in the last `days_back` days.
    pub fn fetch_company_news(&self, symbol: &str, days_back: i64) -> CompanyNews {
        let Some(api_key) = self.api_key.as_deref() else {
            return CompanyNews::failed(symbol, MISSING_KEY_MESSAGE);
        };

        let to = Utc::now().date_naive();
        let from = to - Duration::days(days_back.max(0));
        let url = endpoint(&self.base_url, "company-news");
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let response = match self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", api_key),
            ])
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                let e = e.without_url();
                warn!("News request for {} failed: {}", symbol, e);
                return CompanyNews::failed(symbol, format!("Error fetching news: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let failure = classify_status(status, symbol);
            warn!("News request for {} rejected: {}", symbol, failure);
            return CompanyNews::failed(symbol, failure.to_string());
        }

        match response.json::<Vec<NewsItem>>() {
            Ok(raw) => {
                let items = select_headlines(raw, NEWS_LIMIT);
                debug!("Fetched {} headlines for {}", items.len(), symbol);
                CompanyNews {
                    symbol: symbol.to_string(),
                    items,
                    error: None,
                }
            }
            Err(e) => CompanyNews::failed(
                symbol,
                format!("Error fetching news: {}", e.without_url()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(datetime: i64, headline: &str) -> NewsItem {
        NewsItem {
            datetime,
            headline: headline.to_string(),
            source: "wire".to_string(),
            url: format!("https://news.example/{}", datetime),
            summary: None,
            image: None,
            category: None,
        }
    }

    #[test]
    fn filters_sorts_and_caps() {
        let mut raw: Vec<NewsItem> = (0..30).map(|i| item(i, &format!("story {}", i))).collect();
        raw.push(item(100, "   "));
        raw.push(item(101, ""));

        let selected = select_headlines(raw, NEWS_LIMIT);
        assert_eq!(selected.len(), NEWS_LIMIT);
        assert_eq!(selected[0].datetime, 29);
        assert_eq!(selected[19].datetime, 10);
        assert!(selected.iter().all(|i| !i.headline.trim().is_empty()));
    }

    #[test]
    fn tolerates_sparse_records() {
        let raw: Vec<NewsItem> =
            serde_json::from_str(r#"[{"headline": "only a headline"}, {"datetime": 5}]"#).unwrap();
        let selected = select_headlines(raw, NEWS_LIMIT);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].headline, "only a headline");
    }

    #[test]
    fn missing_key_is_reported_as_value() {
        let client = NewsClient::with_base_url(None, "http://127.0.0.1:9").unwrap();
        let news = client.fetch_company_news("MSFT", 7);
        assert!(news.items.is_empty());
        assert_eq!(news.error.as_deref(), Some(MISSING_KEY_MESSAGE));
    }
}

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use reqwest::{
    Client, StatusCode, Url,
    header::{HeaderMap, HeaderValue},
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::provider::normalize_entries;
use crate::{PriceEntry, PriceHistoryProvider, StockError, Window};

pub const DEFAULT_BASE_API: &str = "https://data.alpaca.markets";

// Upper bound Alpaca accepts for one page of bars.
const PAGE_LIMIT: usize = 10_000;

/// Daily bars from the Alpaca market data API.
#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: Url,
}

impl PriceClient {
    pub fn new(base_api: &str, key_id: &str, secret: &str) -> Result<Self> {
        let base_api = Url::parse(base_api).with_context(|| format!("invalid base url {base_api}"))?;
        ensure!(!base_api.cannot_be_a_base(), "base url {base_api} cannot hold a path");

        let mut headers = HeaderMap::new();
        headers.insert("APCA-API-KEY-ID", HeaderValue::from_str(key_id)?);
        headers.insert("APCA-API-SECRET-KEY", HeaderValue::from_str(secret)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("build http client")?;

        Ok(Self { client, base_api })
    }

    pub fn from_env() -> Result<Self> {
        let base_api =
            std::env::var("APCA_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_API.to_string());
        let key_id = std::env::var("APCA_API_KEY_ID").context("APCA_API_KEY_ID not set")?;
        let secret = std::env::var("APCA_API_SECRET_KEY").context("APCA_API_SECRET_KEY not set")?;
        Self::new(&base_api, &key_id, &secret)
    }

    /// The ticker is pushed as one escaped path segment.
    fn bars_url(&self, ticker: &str) -> Url {
        let mut url = self.base_api.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v2", "stocks", ticker, "bars"]);
        }
        url
    }

    #[instrument(name = "fetch_bars", skip(self, window), fields(window = window.as_str()))]
    async fn fetch_bars(&self, ticker: &str, window: Window) -> Result<Vec<Bar>, StockError> {
        let end = Utc::now();
        let start = end - window.lookback();

        let res = self
            .client
            .get(self.bars_url(ticker))
            .query(&[
                ("feed", "iex"),
                ("timeframe", "1Day"),
                ("adjustment", "raw"),
                ("start", &start.to_rfc3339()),
                ("end", &end.to_rfc3339()),
                ("limit", &PAGE_LIMIT.to_string()),
            ])
            .send()
            .await
            .map_err(|e| transient(ticker, e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(status_error(ticker, status, body));
        }

        let body: BarsResponse = res.json().await.map_err(|e| transient(ticker, e))?;
        let bars = body.bars.unwrap_or_default();
        debug!(bars = bars.len(), "fetched price bars");
        Ok(bars)
    }
}

#[async_trait]
impl PriceHistoryProvider for PriceClient {
    async fn fetch(&self, ticker: &str, window: Window) -> Result<Vec<PriceEntry>, StockError> {
        let bars = self.fetch_bars(ticker, window).await?;
        bars_to_entries(ticker, bars, window)
    }
}

fn transient(ticker: &str, err: reqwest::Error) -> StockError {
    StockError::Transient {
        ticker: ticker.to_string(),
        reason: err.to_string(),
    }
}

fn status_error(ticker: &str, status: StatusCode, body: String) -> StockError {
    let ticker = ticker.to_string();
    match status {
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => StockError::NotFound { ticker },
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => StockError::Transient {
            ticker,
            reason: format!("{s}: {body}"),
        },
        s => StockError::Provider {
            ticker,
            status: s.as_u16(),
            reason: body,
        },
    }
}

fn bars_to_entries(ticker: &str, bars: Vec<Bar>, window: Window) -> Result<Vec<PriceEntry>, StockError> {
    let entries: Vec<PriceEntry> = bars
        .into_iter()
        .map(Bar::into_entry)
        .filter(|entry| {
            let ok = entry.is_well_formed();
            if !ok {
                warn!(ticker, date = %entry.date, "dropping malformed bar");
            }
            ok
        })
        .collect();

    let entries = normalize_entries(entries, window);
    if entries.is_empty() {
        return Err(StockError::NotFound {
            ticker: ticker.to_string(),
        });
    }
    Ok(entries)
}

//
// Match Alpaca API JSON
// https://docs.alpaca.markets/reference/stockbars
//
#[derive(Debug, Deserialize, Clone)]
pub struct BarsResponse {
    #[serde(default)]
    pub bars: Option<Vec<Bar>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Bar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "o")]
    pub open: f64,

    #[serde(rename = "h")]
    pub high: f64,

    #[serde(rename = "l")]
    pub low: f64,

    #[serde(rename = "c")]
    pub close: f64,

    #[serde(rename = "v", default)]
    pub volume: u64,
}

impl Bar {
    /// Daily bars are stamped at midnight exchange time, so the trading day is
    /// the New York calendar date of the timestamp.
    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.with_timezone(&New_York).date_naive()
    }

    fn into_entry(self) -> PriceEntry {
        PriceEntry::new(self.trading_day(), self.open, self.close, self.high, self.low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "bars": [
            {"t": "2024-06-04T04:00:00Z", "o": 194.6, "h": 195.3, "l": 193.0, "c": 194.3, "v": 1000},
            {"t": "2024-06-03T04:00:00Z", "o": 192.9, "h": 194.9, "l": 192.1, "c": 194.0, "v": 1200},
            {"t": "2024-06-05T04:00:00Z", "o": 195.4, "h": 196.9, "l": 194.1, "c": 195.9, "v": 900}
        ],
        "symbol": "AAPL",
        "next_page_token": null
    }"#;

    #[test]
    fn decodes_bars_to_sorted_entries() {
        let body: BarsResponse = serde_json::from_str(BODY).unwrap();
        let entries = bars_to_entries("AAPL", body.bars.unwrap(), Window::OneYear).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(entries[2].close, 195.9);
    }

    #[test]
    fn timestamp_maps_to_new_york_day() {
        let body: BarsResponse = serde_json::from_str(
            r#"{"bars": [{"t": "2024-01-09T05:00:00Z", "o": 1, "h": 1, "l": 1, "c": 1}]}"#,
        )
        .unwrap();
        let bar = &body.bars.unwrap()[0];
        assert_eq!(bar.trading_day(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    }

    #[test]
    fn null_bars_is_not_found() {
        let body: BarsResponse = serde_json::from_str(r#"{"bars": null, "symbol": "ZZZZ"}"#).unwrap();
        let err = bars_to_entries("ZZZZ", body.bars.unwrap_or_default(), Window::FiveDay).unwrap_err();
        assert_eq!(
            err,
            StockError::NotFound {
                ticker: "ZZZZ".into()
            }
        );
    }

    #[test]
    fn malformed_bars_are_dropped() {
        let body: BarsResponse = serde_json::from_str(
            r#"{"bars": [
                {"t": "2024-06-03T04:00:00Z", "o": 10, "h": 9, "l": 8, "c": 9},
                {"t": "2024-06-04T04:00:00Z", "o": 10, "h": 11, "l": 9, "c": 10.5}
            ]}"#,
        )
        .unwrap();
        let entries = bars_to_entries("X", body.bars.unwrap(), Window::FiveDay).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].close, 10.5);
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error("X", StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            StockError::NotFound { .. }
        ));
        assert!(matches!(
            status_error("X", StatusCode::NOT_FOUND, String::new()),
            StockError::NotFound { .. }
        ));
        assert!(status_error("X", StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(status_error("X", StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(matches!(
            status_error("X", StatusCode::FORBIDDEN, "forbidden".into()),
            StockError::Provider { status: 403, .. }
        ));
    }

    #[test]
    fn url_trims_trailing_slash() {
        let client = PriceClient::new("https://data.example/", "id", "secret").unwrap();
        assert_eq!(
            client.bars_url("MSFT").as_str(),
            "https://data.example/v2/stocks/MSFT/bars"
        );
    }

    #[test]
    fn ticker_cannot_escape_bars_path() {
        let client = PriceClient::new("https://data.example", "id", "secret").unwrap();
        let url = client.bars_url("AAPL/../../v1beta1/news?symbols=x&#");

        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[..2], ["v2", "stocks"]);
        assert_eq!(segments[3], "bars");
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(PriceClient::new("not a url", "id", "secret").is_err());
        assert!(PriceClient::new("mailto:desk@example.com", "id", "secret").is_err());
    }
}

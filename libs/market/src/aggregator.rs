use std::cmp::Ordering;
use std::time::Duration;

use futures::{StreamExt, stream};
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::{PeriodSummary, PriceEntry, PriceHistoryProvider, StockError, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Maximum number of provider calls in flight.
    pub concurrency: usize,
    /// Deadline for a single ticker's fetch, retries included.
    pub timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Net direction of a report. A sign test on the summed percent changes,
/// nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: StockError,
}

/// Outcome of one summarize run. Every requested ticker lands in exactly one list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeeklyReport {
    /// Sorted by percent change descending, ties by ticker ascending.
    pub successes: Vec<PeriodSummary>,
    /// In request order.
    pub failures: Vec<TickerFailure>,
}

impl WeeklyReport {
    pub fn net_change(&self) -> f64 {
        self.successes.iter().map(PeriodSummary::percent_change).sum()
    }

    pub fn sentiment(&self) -> Sentiment {
        if self.net_change() > 0.0 {
            Sentiment::Bullish
        } else {
            Sentiment::Bearish
        }
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty()
    }

    /// Splits per-ticker outcomes and sorts the successes for presentation.
    pub fn from_results(results: Vec<(String, Result<PeriodSummary, StockError>)>) -> Self {
        let mut report = WeeklyReport::default();
        for (ticker, res) in results {
            match res {
                Ok(summary) => report.successes.push(summary),
                Err(error) => report.failures.push(TickerFailure { ticker, error }),
            }
        }
        report.successes.sort_by(by_change_desc);
        report
    }
}

pub fn by_change_desc(a: &PeriodSummary, b: &PeriodSummary) -> Ordering {
    b.percent_change()
        .total_cmp(&a.percent_change())
        .then_with(|| a.ticker().cmp(b.ticker()))
}

pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

const MAX_TICKER_LEN: usize = 12;

/// Normalized tickers are 1..=12 characters of `A-Z`, `0-9`, `.`, `^` or `-`.
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || matches!(b, b'.' | b'^' | b'-'))
}

fn checked_ticker(ticker: &str) -> Result<(), StockError> {
    if is_valid_ticker(ticker) {
        Ok(())
    } else {
        Err(StockError::InvalidTicker {
            ticker: ticker.to_string(),
        })
    }
}

/// Fetches and summarizes price history for many tickers at once.
pub struct SummaryAggregator<P> {
    provider: P,
    config: AggregatorConfig,
}

impl<P: PriceHistoryProvider> SummaryAggregator<P> {
    pub fn new(provider: P, config: AggregatorConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Weekly digest over the last five trading days.
    pub async fn weekly_summary<S: AsRef<str>>(&self, tickers: &[S]) -> WeeklyReport {
        self.summarize(tickers, Window::FiveDay).await
    }

    /// Trailing year of daily prices for a chart.
    pub async fn one_year_history(&self, ticker: &str) -> Result<Vec<PriceEntry>, StockError> {
        let ticker = normalize_ticker(ticker);
        checked_ticker(&ticker)?;
        let entries = self.fetch_with_timeout(&ticker, Window::OneYear).await?;
        if entries.is_empty() {
            return Err(StockError::NotFound { ticker });
        }
        Ok(entries)
    }

    /// Per-ticker failures are collected into the report and never abort the batch.
    #[instrument(name = "summarize", skip(self, tickers, window), fields(tickers = tickers.len(), window = window.as_str()))]
    pub async fn summarize<S: AsRef<str>>(&self, tickers: &[S], window: Window) -> WeeklyReport {
        let results: Vec<(String, Result<PeriodSummary, StockError>)> =
            stream::iter(tickers.iter().map(AsRef::as_ref).map(normalize_ticker))
                .map(|ticker| {
                    let span = info_span!("summarize_ticker", ticker = %ticker);
                    async move {
                        let res = self.summarize_one(&ticker, window).await;
                        match &res {
                            Ok(s) => debug!(
                                change = s.percent_change(),
                                days = s.trading_days(),
                                "summarized"
                            ),
                            Err(e) => warn!(error = %e, "ticker excluded from report"),
                        }
                        (ticker, res)
                    }
                    .instrument(span)
                })
                .buffered(self.config.concurrency.max(1))
                .collect()
                .await;

        let report = WeeklyReport::from_results(results);
        info!(
            successes = report.successes.len(),
            failures = report.failures.len(),
            net_change = report.net_change(),
            "summarize completed"
        );
        report
    }

    async fn summarize_one(&self, ticker: &str, window: Window) -> Result<PeriodSummary, StockError> {
        checked_ticker(ticker)?;
        let entries = self.fetch_with_timeout(ticker, window).await?;
        PeriodSummary::build(ticker, entries)
    }

    async fn fetch_with_timeout(&self, ticker: &str, window: Window) -> Result<Vec<PriceEntry>, StockError> {
        let after = self.config.timeout;
        match tokio::time::timeout(after, self.provider.fetch(ticker, window)).await {
            Ok(res) => res,
            Err(_) => Err(StockError::Timeout {
                ticker: ticker.to_string(),
                after,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn summary(ticker: &str, change: f64) -> PeriodSummary {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let close = 100.0 + change;
        PeriodSummary::build(
            ticker,
            vec![PriceEntry::new(date, 100.0, close, close.max(100.0), close.min(100.0))],
        )
        .unwrap()
    }

    #[test]
    fn sorts_by_change_then_ticker() {
        let results = vec![
            ("D".to_string(), Ok(summary("D", -2.0))),
            ("A".to_string(), Ok(summary("A", 5.0))),
            ("C".to_string(), Ok(summary("C", 5.0))),
            ("B".to_string(), Ok(summary("B", -2.0))),
        ];

        let report = WeeklyReport::from_results(results);
        let order: Vec<&str> = report.successes.iter().map(|s| s.ticker()).collect();
        assert_eq!(order, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn sentiment_threshold_is_strictly_positive() {
        let flat = WeeklyReport::from_results(vec![
            ("A".to_string(), Ok(summary("A", 3.0))),
            ("B".to_string(), Ok(summary("B", -3.0))),
        ]);
        assert_eq!(flat.sentiment(), Sentiment::Bearish);

        let up = WeeklyReport::from_results(vec![("A".to_string(), Ok(summary("A", 0.5)))]);
        assert_eq!(up.sentiment(), Sentiment::Bullish);

        assert_eq!(WeeklyReport::default().sentiment(), Sentiment::Bearish);
    }

    #[test]
    fn failures_keep_request_order() {
        let report = WeeklyReport::from_results(vec![
            (
                "ZZZ".to_string(),
                Err(StockError::NotFound {
                    ticker: "ZZZ".into(),
                }),
            ),
            ("A".to_string(), Ok(summary("A", 1.0))),
            (
                "BAD".to_string(),
                Err(StockError::DivisionUndefined {
                    ticker: "BAD".into(),
                }),
            ),
        ]);

        let failed: Vec<&str> = report.failures.iter().map(|f| f.ticker.as_str()).collect();
        assert_eq!(failed, vec!["ZZZ", "BAD"]);
        assert_eq!(report.successes.len(), 1);
    }

    #[test]
    fn normalizes_tickers() {
        assert_eq!(normalize_ticker("  aapl "), "AAPL");
        assert_eq!(normalize_ticker("^gspc"), "^GSPC");
    }

    #[test]
    fn ticker_charset_is_restricted() {
        for ok in ["AAPL", "BRK.B", "^GSPC", "RDS-A", "X"] {
            assert!(is_valid_ticker(ok), "{ok}");
        }
        for bad in ["", "AAPL/../X?Y", "A#B", "A&B=C", "MSFT BARS", "ABCDEFGHIJKLM", "aapl"] {
            assert!(!is_valid_ticker(bad), "{bad}");
        }
    }
}

mod aggregator;
mod error;
mod model;
mod price_client;
mod provider;
mod retry;

pub mod chart;
pub mod report;

pub use aggregator::{
    AggregatorConfig, Sentiment, SummaryAggregator, TickerFailure, WeeklyReport, by_change_desc,
    is_valid_ticker, normalize_ticker,
};
pub use error::StockError;
pub use model::{PeriodSummary, PriceEntry};
pub use price_client::{Bar, BarsResponse, DEFAULT_BASE_API, PriceClient};
pub use provider::{PriceHistoryProvider, Window};
pub use retry::{RetryPolicy, Retrying};

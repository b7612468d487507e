use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

/// Per-ticker failure raised while fetching or summarizing price history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockError {
    /// Unknown ticker, or the provider returned no bars.
    #[error("{ticker}: ticker not found")]
    NotFound { ticker: String },

    /// Network or provider outage. Eligible for a bounded retry.
    #[error("{ticker}: transient provider failure: {reason}")]
    Transient { ticker: String, reason: String },

    #[error("{ticker}: fetch timed out after {after:?}")]
    Timeout { ticker: String, after: Duration },

    #[error("{ticker}: provider returned an empty period")]
    EmptyPeriod { ticker: String },

    /// Period opened at zero, so the percent change has no value.
    #[error("{ticker}: period open is zero, percent change is undefined")]
    DivisionUndefined { ticker: String },

    /// A session with non-finite prices or a low/high range that does not contain open and close.
    #[error("{ticker}: malformed price entry on {date}")]
    MalformedEntry { ticker: String, date: NaiveDate },

    #[error("invalid ticker {ticker:?}")]
    InvalidTicker { ticker: String },

    /// Non-success response that retrying will not fix (bad credentials, bad request).
    #[error("{ticker}: provider rejected request ({status}): {reason}")]
    Provider {
        ticker: String,
        status: u16,
        reason: String,
    },
}

impl StockError {
    pub fn ticker(&self) -> &str {
        match self {
            StockError::NotFound { ticker }
            | StockError::Transient { ticker, .. }
            | StockError::Timeout { ticker, .. }
            | StockError::EmptyPeriod { ticker }
            | StockError::DivisionUndefined { ticker }
            | StockError::MalformedEntry { ticker, .. }
            | StockError::InvalidTicker { ticker }
            | StockError::Provider { ticker, .. } => ticker,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Transient { .. })
    }

    /// Reason shown to chat users next to an excluded ticker.
    pub fn short_reason(&self) -> &'static str {
        match self {
            StockError::NotFound { .. } => "not found",
            StockError::Transient { .. } => "provider unavailable",
            StockError::Timeout { .. } => "timed out",
            StockError::EmptyPeriod { .. }
            | StockError::DivisionUndefined { .. }
            | StockError::MalformedEntry { .. } => "bad data",
            StockError::InvalidTicker { .. } => "invalid ticker",
            StockError::Provider { .. } => "request rejected",
        }
    }
}

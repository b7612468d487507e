use async_trait::async_trait;
use chrono::Duration;

use crate::{PriceEntry, StockError};

/// Fetch window for daily price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    /// Last five trading days.
    FiveDay,
    /// Trailing calendar year.
    OneYear,
}

impl Window {
    /// Calendar span requested from the provider. The five day window asks for
    /// more than a week so weekends and holidays still leave five sessions.
    pub fn lookback(&self) -> Duration {
        match self {
            Window::FiveDay => Duration::days(10),
            Window::OneYear => Duration::days(365),
        }
    }

    /// Number of most recent sessions kept, if the window is session-bounded.
    pub fn max_sessions(&self) -> Option<usize> {
        match self {
            Window::FiveDay => Some(5),
            Window::OneYear => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::FiveDay => "5d",
            Window::OneYear => "1y",
        }
    }
}

/// Source of daily price history.
///
/// Implementations return entries in ascending date order without duplicate
/// dates, fail with [`StockError::NotFound`] for unknown tickers or empty
/// results and with [`StockError::Transient`] for network or service failures.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn fetch(&self, ticker: &str, window: Window) -> Result<Vec<PriceEntry>, StockError>;
}

/// Sort by date, drop duplicate dates and keep only the window's most recent sessions.
pub(crate) fn normalize_entries(mut entries: Vec<PriceEntry>, window: Window) -> Vec<PriceEntry> {
    entries.sort_by_key(|e| e.date);
    entries.dedup_by_key(|e| e.date);

    if let Some(max) = window.max_sessions() {
        let skip = entries.len().saturating_sub(max);
        entries.drain(..skip);
    }

    entries
}

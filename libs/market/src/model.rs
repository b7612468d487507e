use chrono::NaiveDate;

use crate::StockError;

/// One trading day of OHLC prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
}

impl PriceEntry {
    pub fn new(date: NaiveDate, open: f64, close: f64, high: f64, low: f64) -> Self {
        Self {
            date,
            open,
            close,
            high,
            low,
        }
    }

    /// `low <= open, close <= high`, every price finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.close, self.high, self.low];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return false;
        }

        self.low <= self.high
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
    }
}

/// Price history of one ticker over a fetch window, with derived period statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    ticker: String,
    entries: Vec<PriceEntry>,
}

impl PeriodSummary {
    /// Entries are sorted by date and deduplicated (first entry per date wins).
    /// Every entry must pass [`PriceEntry::is_well_formed`].
    pub fn build(ticker: impl Into<String>, mut entries: Vec<PriceEntry>) -> Result<Self, StockError> {
        let ticker = ticker.into();
        if ticker.trim().is_empty() {
            return Err(StockError::InvalidTicker { ticker });
        }
        if entries.is_empty() {
            return Err(StockError::EmptyPeriod { ticker });
        }

        entries.sort_by_key(|e| e.date);
        entries.dedup_by_key(|e| e.date);

        let open = entries[0].open;
        if !open.is_finite() || open.abs() < f64::EPSILON {
            return Err(StockError::DivisionUndefined { ticker });
        }
        if let Some(bad) = entries.iter().find(|e| !e.is_well_formed()) {
            let date = bad.date;
            return Err(StockError::MalformedEntry { ticker, date });
        }

        Ok(Self { ticker, entries })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }

    pub fn period_open(&self) -> f64 {
        self.first().open
    }

    pub fn period_close(&self) -> f64 {
        self.last().close
    }

    pub fn percent_change(&self) -> f64 {
        percent(self.period_open(), self.period_close())
    }

    pub fn period_start(&self) -> NaiveDate {
        self.first().date
    }

    pub fn period_end(&self) -> NaiveDate {
        self.last().date
    }

    pub fn trading_days(&self) -> usize {
        self.entries.len()
    }

    /// Close-to-close change of the last two sessions.
    pub fn last_day_change(&self) -> Option<f64> {
        match self.entries.as_slice() {
            [.., prev, last] if prev.close.abs() >= f64::EPSILON => {
                Some(percent(prev.close, last.close))
            }
            _ => None,
        }
    }

    fn first(&self) -> &PriceEntry {
        &self.entries[0]
    }

    fn last(&self) -> &PriceEntry {
        &self.entries[self.entries.len() - 1]
    }
}

fn percent(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

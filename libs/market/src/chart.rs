use anyhow::{Error, ensure};
use charming::{
    Chart, ImageFormat, ImageRenderer,
    component::{Axis, Legend, Title},
    element::{AxisLabel, AxisType, LineStyle, SplitLine, Symbol, TextStyle},
    series::Line,
};
use chrono::{Datelike, Duration, NaiveDate};

use crate::PriceEntry;

const WIDTH: u32 = 1050;
const HEIGHT: u32 = 750;

/// A marked point on the chart: entry index and its close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extreme {
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
}

/// Where to place the high/low markers and which week to shade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartHints {
    pub high: Extreme,
    pub low: Extreme,
    /// Monday of the last entry's week.
    pub week_start: NaiveDate,
    /// Following Monday, exclusive.
    pub week_end: NaiveDate,
}

impl ChartHints {
    /// Entries must be in ascending date order. Ties on the extremes resolve to
    /// the earliest date.
    pub fn from_entries(entries: &[PriceEntry]) -> Option<Self> {
        let first = entries.first()?;
        let last = entries.last()?;

        let mut high = Extreme {
            index: 0,
            date: first.date,
            close: first.close,
        };
        let mut low = high;

        for (index, e) in entries.iter().enumerate().skip(1) {
            if e.close > high.close {
                high = Extreme {
                    index,
                    date: e.date,
                    close: e.close,
                };
            }
            if e.close < low.close {
                low = Extreme {
                    index,
                    date: e.date,
                    close: e.close,
                };
            }
        }

        let week_start = monday_of(last.date);
        Some(Self {
            high,
            low,
            week_start,
            week_end: week_start + Duration::days(7),
        })
    }

    pub fn in_highlight(&self, date: NaiveDate) -> bool {
        self.week_start <= date && date < self.week_end
    }
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Downward triangle; the high uses the built-in upward one.
const LOW_MARKER: &str = "path://M0,0 L10,0 L5,10 Z";

/// Render a one-year close chart as PNG bytes.
pub fn render_chart(ticker: &str, entries: &[PriceEntry], hints: &ChartHints) -> Result<Vec<u8>, Error> {
    ensure!(!entries.is_empty(), "entries is empty");
    ensure!(
        hints.high.index < entries.len() && hints.low.index < entries.len(),
        "hints out of range: high={}, low={}, entries={}",
        hints.high.index,
        hints.low.index,
        entries.len()
    );

    let n = entries.len();
    let dates: Vec<String> = entries
        .iter()
        .map(|e| e.date.format("%Y-%m-%d").to_string())
        .collect();
    let closes: Vec<f64> = entries.iter().map(|e| e.close).collect();

    let week: Vec<f64> = entries
        .iter()
        .map(|e| if hints.in_highlight(e.date) { e.close } else { f64::NAN })
        .collect();

    let mut highest = vec![f64::NAN; n];
    highest[hints.high.index] = hints.high.close;
    let mut lowest = vec![f64::NAN; n];
    lowest[hints.low.index] = hints.low.close;

    let ticker = ticker.to_uppercase();
    let subtitle = format!(
        "High {:.2} ({})   Low {:.2} ({})",
        hints.high.close,
        hints.high.date.format("%d/%m/%Y"),
        hints.low.close,
        hints.low.date.format("%d/%m/%Y"),
    );

    let chart = Chart::new()
        .background_color("#ffffff")
        .title(
            Title::new()
                .text(format!("{ticker} - 1Y Chart"))
                .subtext(subtitle)
                .left("center")
                .top("2%")
                .text_style(TextStyle::new().color("#202020").font_size(16)),
        )
        .legend(Legend::new().left("left").top("2%"))
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(dates)
                .axis_label(AxisLabel::new().rotate(45).interval(20).color("#606060"))
                .split_line(SplitLine::new().line_style(LineStyle::new().color("#e0e0e0"))),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .name("Price (USD)")
                .scale(true)
                .axis_label(AxisLabel::new().color("#606060"))
                .split_line(SplitLine::new().line_style(LineStyle::new().color("#e0e0e0"))),
        )
        .series(
            Line::new()
                .name("Close")
                .data(closes)
                .symbol(Symbol::None)
                .line_style(LineStyle::new().width(2).color("#1f77b4")),
        )
        .series(
            Line::new()
                .name("Last week")
                .data(week)
                .symbol(Symbol::None)
                .line_style(LineStyle::new().width(8).color("rgba(128,128,128,0.35)")),
        )
        .series(
            Line::new()
                .name("Highest")
                .data(highest)
                .symbol(Symbol::Triangle)
                .symbol_size(12.0)
                .line_style(LineStyle::new().color("#2ca02c")),
        )
        .series(
            Line::new()
                .name("Lowest")
                .data(lowest)
                .symbol(Symbol::Custom(LOW_MARKER.to_string()))
                .symbol_size(12.0)
                .line_style(LineStyle::new().color("#d62728")),
        );

    let mut renderer = ImageRenderer::new(WIDTH, HEIGHT);
    let png_bytes = renderer.render_format(ImageFormat::Png, &chart)?;
    Ok(png_bytes)
}

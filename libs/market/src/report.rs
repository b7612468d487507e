//! Plain-text rendering of summaries for chat messages.

use comfy_table::{CellAlignment, Table, presets::ASCII_FULL};

use crate::{PeriodSummary, TickerFailure, WeeklyReport};

pub const NO_DATA: &str = "No data available this week.";

/// Discord embed description limit, in characters.
pub const DESCRIPTION_LIMIT: usize = 4096;
/// Discord embed field value limit, in characters.
pub const FIELD_LIMIT: usize = 1024;

/// ASCII table of ticker, last close and period change.
pub fn summary_table(summaries: &[PeriodSummary]) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_header(vec!["Ticker", "Last Close", "Weekly Change"]);

    for s in summaries {
        table.add_row(vec![
            s.ticker().to_string(),
            format!("{:.2}", s.period_close()),
            format!("{:.2} %", s.percent_change()),
        ]);
    }

    if let Some(column) = table.column_mut(1) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    if let Some(column) = table.column_mut(2) {
        column.set_cell_alignment(CellAlignment::Center);
    }

    table.to_string()
}

/// Embed body: the table in a code block, or a notice when nothing succeeded.
/// Rows are dropped from the bottom until the body fits [`DESCRIPTION_LIMIT`].
pub fn summary_body(report: &WeeklyReport) -> String {
    if report.is_empty() {
        return NO_DATA.to_string();
    }

    let total = report.successes.len();
    let mut shown = total;
    loop {
        let mut body = format!("```\n{}\n```", summary_table(&report.successes[..shown]));
        if shown < total {
            body.push_str(&more(total - shown));
        }
        if shown == 0 || body.chars().count() <= DESCRIPTION_LIMIT {
            return body;
        }
        shown -= 1;
    }
}

/// `Data period: 03/06 - 07/06 (5 trading days)`, taken from the first row.
pub fn period_footer(report: &WeeklyReport) -> Option<String> {
    let first = report.successes.first()?;
    Some(format!(
        "Data period: {} - {} ({} trading days)",
        first.period_start().format("%d/%m"),
        first.period_end().format("%d/%m"),
        first.trading_days()
    ))
}

/// `Excluded: BBB (not found), ...`, cut to fit [`FIELD_LIMIT`].
pub fn failure_line(failures: &[TickerFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let mut line = String::from("Excluded:");
    for (i, f) in failures.iter().enumerate() {
        let rest = failures.len() - i - 1;
        let sep = if rest > 0 { "," } else { "" };
        let item = format!(" {} ({}){sep}", f.ticker, f.error.short_reason());
        let reserve = if rest > 0 { more(rest).chars().count() } else { 0 };
        if line.chars().count() + item.chars().count() + reserve > FIELD_LIMIT {
            line.push_str(&more(failures.len() - i));
            return Some(line);
        }
        line.push_str(&item);
    }
    Some(line)
}

fn more(hidden: usize) -> String {
    format!(" … and {hidden} more")
}

pub fn trend_emoji(value: f64) -> &'static str {
    if value > 0.0 {
        "🟢"
    } else if value < 0.0 {
        "🔴"
    } else {
        "⚪"
    }
}

/// Return lines shown under a chart.
pub fn chart_description(summary: &PeriodSummary) -> String {
    let mut lines = Vec::with_capacity(2);
    if let Some(day) = summary.last_day_change() {
        lines.push(format!("{}**Return, 1d**: {:.2} %", trend_emoji(day), day));
    }
    let period = summary.percent_change();
    lines.push(format!(
        "{}**Return, period**: {:.2} %",
        trend_emoji(period),
        period
    ));
    lines.push(format!("**Last Close**: {:.2} USD", summary.period_close()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{PriceEntry, StockError};

    fn summary(ticker: &str, closes: &[f64]) -> PeriodSummary {
        let entries = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let date = NaiveDate::from_ymd_opt(2024, 6, 3 + i as u32).unwrap();
                PriceEntry::new(date, closes[0], c, c.max(closes[0]), c.min(closes[0]))
            })
            .collect();
        PeriodSummary::build(ticker, entries).unwrap()
    }

    #[test]
    fn table_contains_rows() {
        let table = summary_table(&[summary("AAPL", &[100.0, 110.0]), summary("MSFT", &[50.0, 49.0])]);

        assert!(table.contains("Ticker"));
        assert!(table.contains("Last Close"));
        assert!(table.contains("Weekly Change"));
        assert!(table.contains("110.00"));
        assert!(table.contains("10.00 %"));
        assert!(table.contains("-2.00 %"));
        let aapl = table.find("AAPL").unwrap();
        let msft = table.find("MSFT").unwrap();
        assert!(aapl < msft);
    }

    #[test]
    fn empty_report_renders_notice() {
        let report = WeeklyReport::default();
        assert_eq!(summary_body(&report), NO_DATA);
        assert_eq!(period_footer(&report), None);
    }

    #[test]
    fn footer_uses_first_row_period() {
        let report = WeeklyReport {
            successes: vec![summary("AAPL", &[1.0, 1.0, 1.0, 1.0, 2.0])],
            failures: vec![],
        };
        assert_eq!(
            period_footer(&report).unwrap(),
            "Data period: 03/06 - 07/06 (5 trading days)"
        );
    }

    #[test]
    fn failures_are_listed_with_reason() {
        let failures = vec![
            TickerFailure {
                ticker: "BBB".into(),
                error: StockError::NotFound {
                    ticker: "BBB".into(),
                },
            },
            TickerFailure {
                ticker: "CCC".into(),
                error: StockError::Timeout {
                    ticker: "CCC".into(),
                    after: std::time::Duration::from_secs(5),
                },
            },
        ];
        assert_eq!(
            failure_line(&failures).unwrap(),
            "Excluded: BBB (not found), CCC (timed out)"
        );
        assert_eq!(failure_line(&[]), None);
    }

    fn unavailable(n: usize) -> Vec<TickerFailure> {
        (0..n)
            .map(|i| {
                let ticker = format!("TK{i:02}");
                TickerFailure {
                    ticker: ticker.clone(),
                    error: StockError::Transient {
                        ticker,
                        reason: "503".into(),
                    },
                }
            })
            .collect()
    }

    #[test]
    fn long_failure_line_is_capped() {
        let line = failure_line(&unavailable(40)).unwrap();

        assert!(line.chars().count() <= FIELD_LIMIT, "{} chars", line.chars().count());
        assert!(line.starts_with("Excluded: TK00 (provider unavailable),"));
        assert!(line.ends_with(" more"));

        let shown = line.matches("(provider unavailable)").count();
        assert!(line.ends_with(&format!("… and {} more", 40 - shown)));
    }

    #[test]
    fn short_failure_line_is_untouched() {
        let line = failure_line(&unavailable(3)).unwrap();
        assert_eq!(
            line,
            "Excluded: TK00 (provider unavailable), TK01 (provider unavailable), TK02 (provider unavailable)"
        );
    }

    #[test]
    fn long_table_is_capped() {
        let successes: Vec<PeriodSummary> = (0..200)
            .map(|i| summary(&format!("T{i:03}"), &[100.0, 101.0]))
            .collect();
        let report = WeeklyReport {
            successes,
            failures: vec![],
        };

        let body = summary_body(&report);
        assert!(body.chars().count() <= DESCRIPTION_LIMIT, "{} chars", body.chars().count());
        assert!(body.starts_with("```\n"));
        assert!(body.contains("T000"));
        assert!(!body.contains("T199"));
        assert!(body.ends_with(" more"));
    }

    #[test]
    fn chart_description_lines() {
        let desc = chart_description(&summary("AAPL", &[100.0, 100.0, 90.0]));
        assert!(desc.contains("🔴**Return, 1d**: -10.00 %"));
        assert!(desc.contains("🔴**Return, period**: -10.00 %"));
        assert!(desc.ends_with("**Last Close**: 90.00 USD"));
    }

    #[test]
    fn emoji_sign() {
        assert_eq!(trend_emoji(1.0), "🟢");
        assert_eq!(trend_emoji(-0.1), "🔴");
        assert_eq!(trend_emoji(0.0), "⚪");
    }
}

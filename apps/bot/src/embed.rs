use market::{PeriodSummary, Sentiment, WeeklyReport, report};
use serenity::all::{CreateEmbed, CreateEmbedFooter};

pub const GREEN: u32 = 0x00FF00;
pub const RED: u32 = 0xFF0000;

const DIGEST_TITLE: &str = "📈 Weekly Stock Market Update";
const DIGEST_URL: &str = "https://finance.yahoo.com/quote/";

pub fn sentiment_color(sentiment: Sentiment) -> u32 {
    match sentiment {
        Sentiment::Bullish => GREEN,
        Sentiment::Bearish => RED,
    }
}

pub fn weekly_digest(report: &WeeklyReport) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(DIGEST_TITLE)
        .url(DIGEST_URL)
        .color(sentiment_color(report.sentiment()))
        .description(report::summary_body(report));

    if let Some(excluded) = report::failure_line(&report.failures) {
        embed = embed.field("Missing data", excluded, false);
    }
    if let Some(footer) = report::period_footer(report) {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }

    embed
}

pub fn chart(summary: &PeriodSummary, filename: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("{} - 1Y Chart", summary.ticker()))
        .description(report::chart_description(summary))
        .color(if summary.percent_change() > 0.0 { GREEN } else { RED })
        .image(format!("attachment://{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_follows_sentiment() {
        assert_eq!(sentiment_color(Sentiment::Bullish), GREEN);
        assert_eq!(sentiment_color(Sentiment::Bearish), RED);
    }
}

use anyhow::anyhow;
use market::chart::{ChartHints, render_chart};
use market::{PeriodSummary, StockError, normalize_ticker};
use poise::CreateReply;
use serenity::all::CreateAttachment;
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument;

use crate::{Context, Error, embed};

/// Returns a 1Y chart of the ticker
#[poise::command(slash_command)]
pub async fn chart(
    ctx: Context<'_>,
    #[description = "Ticker symbol (e.g., AAPL, ^GSPC)"] ticker: String,
) -> Result<(), Error> {
    let ticker = normalize_ticker(&ticker);
    let span = info_span!("chart_command", ticker = %ticker, user_id = ctx.author().id.get());
    send_chart(ctx, ticker).instrument(span).await
}

async fn send_chart(ctx: Context<'_>, ticker: String) -> Result<(), Error> {
    ctx.defer().await?;

    info!("fetching one year of prices");
    let summary = match ctx
        .data()
        .aggregator
        .one_year_history(&ticker)
        .await
        .and_then(|entries| PeriodSummary::build(ticker.clone(), entries))
    {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "chart data unavailable");
            ctx.say(unavailable_message(&ticker, &e)).await?;
            return Ok(());
        }
    };
    debug!(entries = summary.trading_days(), "fetched prices");

    let hints = ChartHints::from_entries(summary.entries())
        .ok_or_else(|| anyhow!("no chart data for {ticker}"))?;

    let chart_ticker = ticker.clone();
    let chart_entries = summary.entries().to_vec();
    let image_bytes = tokio::task::spawn_blocking(move || {
        render_chart(&chart_ticker, &chart_entries, &hints)
    })
    .await?
    .inspect_err(|e| error!(error = ?e, "render_chart failed"))?;
    info!(bytes = image_bytes.len(), "chart generated");

    let filename = format!("plot-{ticker}.png");
    let attachment = CreateAttachment::bytes(image_bytes, filename.clone());

    ctx.send(
        CreateReply::default()
            .embed(embed::chart(&summary, &filename))
            .attachment(attachment),
    )
    .await?;

    Ok(())
}

fn unavailable_message(ticker: &str, err: &StockError) -> String {
    match err {
        StockError::NotFound { .. } | StockError::InvalidTicker { .. } => {
            format!("Could not fetch data for {ticker}, ensure ticker is valid")
        }
        _ => format!(
            "Could not fetch data for {ticker} ({}), try again later",
            err.short_reason()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_asks_to_check_ticker() {
        let err = StockError::NotFound {
            ticker: "ZZZZ".into(),
        };
        assert_eq!(
            unavailable_message("ZZZZ", &err),
            "Could not fetch data for ZZZZ, ensure ticker is valid"
        );
    }

    #[test]
    fn timeout_asks_to_retry() {
        let err = StockError::Timeout {
            ticker: "AAPL".into(),
            after: std::time::Duration::from_secs(15),
        };
        assert_eq!(
            unavailable_message("AAPL", &err),
            "Could not fetch data for AAPL (timed out), try again later"
        );
    }
}

use poise::CreateReply;
use tracing::{info, info_span};
use tracing_futures::Instrument;

use crate::{Context, Error, embed};

/// Weekly market summary of the tracked tickers
#[poise::command(slash_command)]
pub async fn summary(ctx: Context<'_>) -> Result<(), Error> {
    let span = info_span!("summary_command", user_id = ctx.author().id.get());
    send_summary(ctx).instrument(span).await
}

async fn send_summary(ctx: Context<'_>) -> Result<(), Error> {
    // Fetching can outlast the interaction acknowledgement window.
    ctx.defer().await?;

    let tickers = ctx.data().tickers.clone();
    info!(count = tickers.len(), "building weekly summary");

    let report = ctx.data().aggregator.weekly_summary(tickers.as_slice()).await;

    info!(
        successes = report.successes.len(),
        failures = report.failures.len(),
        sentiment = ?report.sentiment(),
        "sending weekly summary"
    );
    ctx.send(CreateReply::default().embed(embed::weekly_digest(&report)))
        .await?;

    Ok(())
}

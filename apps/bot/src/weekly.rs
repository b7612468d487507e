use std::sync::Arc;

use anyhow::Result;
use bot::{Aggregator, embed};
use serenity::all::{ChannelId, CreateMessage, Http};
use tracing::{info, instrument};

/// Cron expression for the digest post: Friday after the New York close.
pub const DIGEST_SCHEDULE: &str = "0 30 16 * * Fri";

#[instrument(
    name = "run_weekly",
    skip(http, aggregator, tickers),
    fields(channel_id = %channel)
)]
pub async fn run_weekly(
    http: Arc<Http>,
    channel: ChannelId,
    aggregator: Arc<Aggregator>,
    tickers: Arc<Vec<String>>,
) -> Result<()> {
    info!(total_tickers = tickers.len(), "building weekly digest");

    let report = aggregator.weekly_summary(tickers.as_slice()).await;

    info!(
        successes = report.successes.len(),
        failures = report.failures.len(),
        net_change = report.net_change(),
        "sending weekly digest"
    );

    let msg = CreateMessage::new().embed(embed::weekly_digest(&report));
    channel.send_message(&http, msg).await?;

    Ok(())
}

mod chart;
mod summary;

use crate::{Context, Error};
use chart::chart;
use summary::summary;

#[poise::command(slash_command, rename = "stock", subcommands("summary", "chart"))]
pub async fn stock_command(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

use std::sync::Arc;

use anyhow::{Context as _, Result};
use bot::{Data, command::stock::stock_command, config::Config, presence};
use chrono_tz::America::New_York;
use market::{PriceClient, Retrying, SummaryAggregator};
use poise::{Framework, FrameworkOptions};
use serenity::all::{ChannelId, ClientBuilder, GatewayIntents, GuildId};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod weekly;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        tickers = config.tickers.len(),
        concurrency = config.aggregator.concurrency,
        timeout = ?config.aggregator.timeout,
        "config loaded"
    );

    let price_client = PriceClient::from_env().context("init price client failed")?;
    let aggregator = Arc::new(SummaryAggregator::new(
        Retrying::new(price_client, config.retry),
        config.aggregator,
    ));
    let tickers = Arc::new(config.tickers.clone());

    let intents = GatewayIntents::non_privileged();
    let commands = vec![stock_command()];

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup({
            let aggregator = Arc::clone(&aggregator);
            let tickers = Arc::clone(&tickers);
            let config = config.clone();

            move |ctx, ready, framework| {
                let aggregator = Arc::clone(&aggregator);
                let tickers = Arc::clone(&tickers);
                let config = config.clone();

                Box::pin(async move {
                    info!(user = %ready.user.name, id = %ready.user.id, "connected successfully");

                    let commands = &framework.options().commands;
                    match config.guild_id {
                        Some(guild) => {
                            info!(guild, "registering commands in guild");
                            poise::builtins::register_in_guild(ctx, commands, GuildId::new(guild))
                                .await?;
                        }
                        None => poise::builtins::register_globally(ctx, commands).await?,
                    }

                    presence::spawn_rotation(ctx.clone(), config.version.clone());

                    Ok(Data {
                        aggregator,
                        tickers,
                    })
                })
            }
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("create discord client")?;

    let sched = JobScheduler::new()
        .await
        .context("create job scheduler")?;

    if let Some(channel_id) = config.digest_channel_id {
        let http = client.http.clone();
        let channel = ChannelId::new(channel_id);
        let aggregator_job = Arc::clone(&aggregator);
        let tickers_job = Arc::clone(&tickers);

        sched
            .add(Job::new_async_tz(
                weekly::DIGEST_SCHEDULE,
                New_York,
                move |_uuid, _l| {
                    let http = http.clone();
                    let aggregator = Arc::clone(&aggregator_job);
                    let tickers = Arc::clone(&tickers_job);

                    Box::pin(async move {
                        if let Err(e) = weekly::run_weekly(http, channel, aggregator, tickers).await
                        {
                            error!(error = ?e, "run_weekly failed");
                        }
                    })
                },
            )?)
            .await?;
        info!(channel_id, schedule = weekly::DIGEST_SCHEDULE, "weekly digest scheduled");
    } else {
        info!("DISCORD_DIGEST_CHANNEL_ID not set, weekly digest disabled");
    }

    sched.shutdown_on_ctrl_c();
    sched.start().await?;

    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!(error = ?why, "client error");
        }
    });

    shutdown_signal().await?;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("install SIGINT handler")?;
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

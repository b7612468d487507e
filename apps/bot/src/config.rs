use std::time::Duration;

use anyhow::{Context, Result, bail};
use market::{AggregatorConfig, RetryPolicy, normalize_ticker};

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Register commands to this guild only; globally when unset.
    pub guild_id: Option<u64>,
    /// Channel for the scheduled weekly digest; disabled when unset.
    pub digest_channel_id: Option<u64>,
    pub tickers: Vec<String>,
    pub version: String,
    pub aggregator: AggregatorConfig,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        let guild_id = parse_opt(var("DISCORD_GUILD_ID"), "DISCORD_GUILD_ID")?;
        let digest_channel_id =
            parse_opt(var("DISCORD_DIGEST_CHANNEL_ID"), "DISCORD_DIGEST_CHANNEL_ID")?;

        let tickers = parse_tickers(&var("STOCK_TICKERS").context("STOCK_TICKERS not set")?);
        if tickers.is_empty() {
            bail!("STOCK_TICKERS has no valid tickers");
        }

        let defaults = AggregatorConfig::default();
        let concurrency: usize = parse_opt(var("FETCH_CONCURRENCY"), "FETCH_CONCURRENCY")?
            .unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            bail!("FETCH_CONCURRENCY must be at least 1");
        }
        let timeout = parse_opt(var("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let retry = RetryPolicy {
            max_retries: parse_opt(var("FETCH_MAX_RETRIES"), "FETCH_MAX_RETRIES")?
                .unwrap_or(RetryPolicy::default().max_retries),
            ..RetryPolicy::default()
        };

        Ok(Self {
            discord_token,
            guild_id,
            digest_channel_id,
            tickers,
            version: var("APP_VERSION").unwrap_or_else(|| "Unknown".to_string()),
            aggregator: AggregatorConfig {
                concurrency,
                timeout,
            },
            retry,
        })
    }
}

/// Comma-separated list, normalized, blanks and repeats dropped, order kept.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for t in raw.split(',').map(normalize_ticker) {
        if !t.is_empty() && !tickers.contains(&t) {
            tickers.push(t);
        }
    }
    tickers
}

fn parse_opt<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| v.trim().parse::<T>().with_context(|| format!("invalid {key}: {v}")))
        .transpose()
}

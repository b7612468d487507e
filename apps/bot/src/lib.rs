use std::sync::Arc;

use market::{PriceClient, Retrying, SummaryAggregator};

pub mod command;
pub mod config;
pub mod embed;
pub mod presence;

pub type Provider = Retrying<PriceClient>;
pub type Aggregator = SummaryAggregator<Provider>;

pub struct Data {
    pub aggregator: Arc<Aggregator>,
    pub tickers: Arc<Vec<String>>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

use chrono::Utc;
use consts::DB_SAVE_INTERVAL;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Instant;
use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::sync::Mutex;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod algorithm;
mod business_logic;
mod calculator;
mod commands;
mod config;
mod consts;
mod errors;
mod event_processors;
mod formatter;
mod hashrate;
mod models;
mod prices;
mod storages;
mod types;
mod utils;

#[cfg(test)]
mod tests;

use commands::{AdminCommand, Command};
use config::Settings;
use event_processors::{
    is_admin_message, process_admin_command, process_command, refresh_prices, BotState,
};
use prices::PriceFeed;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use storages::{
    ensure_schema, CatalogEngine, CatalogEngineTrait, DbSerializable, GuideEngine, MarketEngine,
    SellRequestEngine, UserEngine,
};

fn spawn_price_refresher(
    feed: Arc<PriceFeed>,
    market: Arc<Mutex<MarketEngine>>,
    period: tokio::time::Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            let _start = Instant::now();
            match refresh_prices(&feed, &market).await {
                Ok(updated) => info!(
                    "Refreshed prices for {} coins in {:?}",
                    updated,
                    _start.elapsed()
                ),
                // keep serving the previous snapshot
                Err(err) => warn!("Failed to refresh prices: {}", err),
            }
        }
    });
}

fn spawn_db_saver(
    pool: Pool<Postgres>,
    market: Arc<Mutex<MarketEngine>>,
    catalog: Arc<Mutex<CatalogEngine>>,
    users: Arc<Mutex<UserEngine>>,
    guide: Arc<Mutex<GuideEngine>>,
    sell_requests: Arc<Mutex<SellRequestEngine>>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DB_SAVE_INTERVAL);
        loop {
            interval.tick().await;

            let market = market.lock().await.clone();
            let catalog = catalog.lock().await.clone();
            let users = users.lock().await.clone();
            let guide = guide.lock().await.clone();
            let sell_requests = sell_requests.lock().await.clone();

            let _start = Instant::now();
            market.serialize(&pool).await;
            catalog.serialize(&pool).await;
            users.serialize(&pool).await;
            guide.serialize(&pool).await;
            sell_requests.serialize(&pool).await;

            let _duration = _start.elapsed();

            info!("Dumped state to DB in {:?}", _duration);

            info!(
                "Data saved to the database at {:?} | coins {} | models {} | users {} | sell requests {}",
                Utc::now(),
                market.get_size(),
                catalog.get_size(),
                users.get_size(),
                sell_requests.get_size()
            );
        }
    });
}

fn init_logging() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    fn get_filter() -> Result<EnvFilter, Box<dyn std::error::Error>> {
        Ok(EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env()?)
    }

    let file_appender = tracing_appender::rolling::hourly("logs/", "asic_profit_bot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_filter = get_filter()?;
    let console_filter = get_filter()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(true)
                .with_filter(console_filter),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let _guard = init_logging()?;

    info!("Starting the bot...");

    let settings = Settings::from_env()?;
    if settings.admin_id.is_none() {
        warn!("ADMIN_ID is not set, admin commands and forwarding are disabled");
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    ensure_schema(&pool).await?;

    let market_itself = MarketEngine::deserialize(&pool).await;
    let catalog_itself = CatalogEngine::deserialize(&pool).await;
    let users_itself = UserEngine::deserialize(&pool).await;
    let guide_itself = GuideEngine::deserialize(&pool).await;
    let sell_requests_itself = SellRequestEngine::deserialize(&pool).await;

    info!(
        "Loaded state for MarketEngine: {} | CatalogEngine: {} | UserEngine: {} | SellRequestEngine: {}",
        market_itself.get_size(),
        catalog_itself.get_size(),
        users_itself.get_size(),
        sell_requests_itself.get_size()
    );

    let market = Arc::new(Mutex::new(market_itself));
    let catalog = Arc::new(Mutex::new(catalog_itself));
    let users = Arc::new(Mutex::new(users_itself));
    let guide = Arc::new(Mutex::new(guide_itself));
    let sell_requests = Arc::new(Mutex::new(sell_requests_itself));
    let feed = Arc::new(PriceFeed::new(&settings.coingecko_base_url)?);

    spawn_price_refresher(
        feed.clone(),
        market.clone(),
        settings.price_refresh_interval,
    );

    spawn_db_saver(
        pool,
        market.clone(),
        catalog.clone(),
        users.clone(),
        guide.clone(),
        sell_requests.clone(),
    );

    let bot = Bot::from_env();
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        error!("Failed to set bot commands: {:?}", err);
    }

    let state = BotState {
        market,
        catalog,
        users,
        guide,
        sell_requests,
        feed,
        settings: Arc::new(settings),
    };

    // admin commands are invisible to everyone else: the branch is skipped
    // and the public parser does not know them
    let handler = Update::filter_message()
        .branch(
            dptree::filter(|msg: Message, state: BotState| {
                is_admin_message(&msg, &state.settings)
            })
            .filter_command::<AdminCommand>()
            .endpoint(process_admin_command),
        )
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(process_command),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

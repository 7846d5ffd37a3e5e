mod callback;
mod channels;
mod commands;
mod config;
mod dates;
mod interaction;
mod notifier;
mod ranker;
mod state;
mod traits;
mod types;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use teloxide::Bot;
use tracing_subscriber::EnvFilter;

use crate::channels::{TelegramChannel, TelegramGateway};
use crate::config::AppConfig;
use crate::notifier::BirthdayNotifier;
use crate::state::{SqliteLock, SqliteStore};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = PathBuf::from("config.toml");
    let config = AppConfig::load(&config_path)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::connect(&config.state.db_path).await?);
    let lock = Arc::new(SqliteLock::new(store.pool().clone()));

    let timezone: Tz = config
        .notifier
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Bad notifier.timezone: {}", e))?;
    let time_of_day = NaiveTime::parse_from_str(&config.notifier.time_of_day, "%H:%M")?;

    let bot = Bot::new(&config.telegram.bot_token);
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));

    let notifier = Arc::new(BirthdayNotifier::new(
        store.clone(),
        gateway.clone(),
        lock,
        timezone,
        time_of_day,
        Duration::from_secs(config.notifier.lock_lease_secs),
        Duration::from_secs(config.notifier.tick_interval_secs),
    ));
    notifier.spawn();

    let channel = Arc::new(TelegramChannel::new(
        bot,
        gateway,
        store,
        timezone,
        config.birthdays.upcoming_limit,
    ));
    channel.start_with_retry().await;

    Ok(())
}

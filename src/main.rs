use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lyrics_bot::auth::AdminGate;
use lyrics_bot::bot::{self, TelegramTransport, UpdateDispatcher};
use lyrics_bot::config::BotConfig;
use lyrics_bot::db::{self, PgCatalog};
use lyrics_bot::localization::init_localization;
use lyrics_bot::media::TelegramImgurIngestion;
use lyrics_bot::session::{spawn_sweeper, SessionStore};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.json_logs);

    info!("Starting Lyrics Telegram Bot");

    init_localization(config.locales_dir.as_deref()).context("Failed to load messages")?;

    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    db::init_database_schema(&pool).await?;

    let bot = Bot::new(&config.bot_token);

    let media = TelegramImgurIngestion::new(bot.clone(), config.media.clone())
        .context("Failed to set up image ingestion")?;
    let sessions = Arc::new(SessionStore::new(config.session.idle_timeout));
    let gate = AdminGate::new(config.admin_ids.iter().copied());
    info!(admins = gate.len(), "Authorization gate configured");

    let dispatcher = Arc::new(UpdateDispatcher::new(
        Arc::new(PgCatalog::new(pool)),
        Arc::new(media),
        Arc::new(TelegramTransport::new(bot.clone())),
        Arc::clone(&sessions),
        gate,
    ));

    spawn_sweeper(sessions, config.session.sweep_interval);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

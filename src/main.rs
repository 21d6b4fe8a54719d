mod api;
mod config;
mod handler;
mod imei;
mod notifier;
mod platform;
mod verifier;
mod whitelist;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::ApiState;
use crate::config::Config;
use crate::handler::MessageHandler;
use crate::notifier::TelegramNotifier;
use crate::verifier::{ImeiChecker, VerificationClient};
use crate::whitelist::WhitelistStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,imeibot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Verification service: {}", config.verifier.api_url);
    info!("  Whitelist file: {}", config.whitelist.path.display());
    info!("  HTTP API: {}", config.api.bind_address());

    // Shared collaborators, built once
    let checker: Arc<dyn ImeiChecker> = Arc::new(VerificationClient::new(config.verifier.clone()));
    let telegram_http = notifier::telegram_client(config.telegram.ca_bundle.as_deref())?;
    let bot = Bot::with_client(&config.telegram.bot_token, telegram_http);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));
    let whitelist = WhitelistStore::new(config.whitelist.path.clone());
    let handler = Arc::new(MessageHandler::new(whitelist, checker.clone(), notifier));

    // Telegram loop runs in the background
    tokio::spawn(async move {
        if let Err(e) = platform::telegram::run(bot, handler).await {
            error!("Telegram platform stopped: {:#}", e);
        }
    });

    let state = Arc::new(ApiState::new(config.api.auth_token.clone(), checker));
    api::serve(state, &config.api.bind_address()).await?;

    Ok(())
}

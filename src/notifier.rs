use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{info, warn};

/// Outbound chat replies. Delivery is best effort: callers never learn
/// whether a message went out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str);
}

/// HTTP client for Bot API calls. With `ca_bundle` set, only the roots in
/// that PEM file are trusted.
pub fn telegram_client(ca_bundle: Option<&Path>) -> Result<reqwest::Client> {
    let mut builder = teloxide::net::default_reqwest_settings();

    if let Some(path) = ca_bundle {
        let pem = std::fs::read(path)
            .with_context(|| format!("Failed to read CA bundle: {}", path.display()))?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem)
            .with_context(|| format!("Failed to parse CA bundle: {}", path.display()))?;
        if certs.is_empty() {
            anyhow::bail!("No certificates found in CA bundle: {}", path.display());
        }

        info!(
            "Trusting {} root certificate(s) from {}",
            certs.len(),
            path.display()
        );
        builder = builder.tls_built_in_root_certs(false);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder.build().context("Failed to build Telegram HTTP client")
}

pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.bot.send_message(ChatId(chat_id), text).await {
            warn!("Failed to send message to chat {}: {}", chat_id, e);
        }
    }
}

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use crate::handler::MessageHandler;
use crate::platform::IncomingMessage;

/// Run the Telegram long-polling loop until the process exits
pub async fn run(bot: Bot, handler: Arc<MessageHandler>) -> Result<()> {
    info!("Starting Telegram platform...");

    let schema = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![handler])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn to_incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        chat_id: msg.chat.id.0,
        text: msg.text().map(str::to_string),
    }
}

async fn handle_message(msg: Message, handler: Arc<MessageHandler>) -> ResponseResult<()> {
    let incoming = to_incoming(&msg);

    debug!(
        "Telegram message from chat {}: {:?}",
        incoming.chat_id, incoming.text
    );

    let outcome = handler.handle(&incoming).await;
    debug!("Chat {} handled: {:?}", incoming.chat_id, outcome);

    Ok(())
}

pub mod telegram;

/// A chat message as seen by the handler. Only the chat id and text are read.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform-specific chat id
    pub chat_id: i64,
    /// The message text, absent for stickers, photos and the like
    pub text: Option<String>,
}

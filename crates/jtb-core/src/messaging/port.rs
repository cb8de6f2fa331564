use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound side of a messenger.
///
/// Telegram is the only implementation; the dispatcher depends on this trait so
/// it can be exercised without a bot token.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a message formatted with Telegram's HTML subset.
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
}

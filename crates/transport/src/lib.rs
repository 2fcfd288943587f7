use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{ChatId, MessageHandle},
    protocol::ViewMessage,
};

pub mod dispatch;
pub mod http;
pub mod memory;
pub mod views;

pub use dispatch::{
    DeliveryOutcome, DeliveryReport, DeliveryState, NotificationDispatcher, RetryPolicy, Sleeper,
    TokioSleeper,
};
pub use http::BotApiTransport;
pub use memory::{MemoryTransport, SentKind, SentMessage};
pub use views::EphemeralMessageTracker;

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a message that becomes part of the chat's current view.
    async fn send_rendered_view(&self, chat_id: ChatId, message: &ViewMessage)
        -> Result<MessageHandle>;
    async fn delete_message(&self, chat_id: ChatId, handle: MessageHandle) -> Result<()>;
    /// Sends a message that is not tracked as part of any view, e.g. an order
    /// notification for staff.
    async fn send_to_channel(&self, channel_id: ChatId, message: &ViewMessage)
        -> Result<MessageHandle>;
}

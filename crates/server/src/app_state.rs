use std::sync::Arc;

use server_api::OrderingContext;
use shared::{domain::ChatId, protocol::Reply};
use tracing::warn;
use transport::{ChatTransport, EphemeralMessageTracker};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) ordering: OrderingContext,
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) views: EphemeralMessageTracker,
}

impl AppState {
    pub(crate) fn new(ordering: OrderingContext, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            ordering,
            transport,
            views: EphemeralMessageTracker::new(),
        }
    }

    /// Shows `reply.view` in the acting chat, replacing whatever view was
    /// there, then sends the forwards as standalone messages.
    pub(crate) async fn deliver(&self, chat_id: ChatId, reply: &Reply) {
        if !reply.view.messages.is_empty() {
            self.views
                .present(chat_id, &reply.view, self.transport.as_ref())
                .await;
        }
        for forward in &reply.forwards {
            if let Err(error) = self
                .transport
                .send_to_channel(forward.chat_id, &forward.message)
                .await
            {
                warn!(chat_id = forward.chat_id.0, %error, "failed to forward message");
            }
        }
    }
}

use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use shared::{
    domain::{ChatId, MessageHandle},
    protocol::View,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ChatTransport;

/// Remembers which bot messages make up each chat's current view.
///
/// The bookkeeping swap is atomic and always succeeds; deleting the old
/// messages on the platform is best-effort and happens after the swap.
#[derive(Clone, Default)]
pub struct EphemeralMessageTracker {
    current: Arc<Mutex<HashMap<ChatId, Vec<MessageHandle>>>>,
}

impl EphemeralMessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self, chat_id: ChatId) -> Vec<MessageHandle> {
        self.current
            .lock()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn replace_view(
        &self,
        chat_id: ChatId,
        handles: Vec<MessageHandle>,
        transport: &dyn ChatTransport,
    ) {
        let previous = {
            let mut current = self.current.lock().await;
            if handles.is_empty() {
                current.remove(&chat_id).unwrap_or_default()
            } else {
                current.insert(chat_id, handles).unwrap_or_default()
            }
        };

        let deletions = previous.into_iter().map(|handle| async move {
            if let Err(error) = transport.delete_message(chat_id, handle).await {
                warn!(chat_id = chat_id.0, handle = handle.0, %error, "failed to delete stale view message");
            }
        });
        join_all(deletions).await;
    }

    pub async fn clear(&self, chat_id: ChatId, transport: &dyn ChatTransport) {
        self.replace_view(chat_id, Vec::new(), transport).await;
    }

    /// Sends every message of `view` and makes them the chat's current view.
    /// Messages that fail to send are skipped.
    pub async fn present(
        &self,
        chat_id: ChatId,
        view: &View,
        transport: &dyn ChatTransport,
    ) -> Vec<MessageHandle> {
        let mut handles = Vec::with_capacity(view.messages.len());
        for message in &view.messages {
            match transport.send_rendered_view(chat_id, message).await {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    warn!(chat_id = chat_id.0, %error, "failed to send view message");
                }
            }
        }
        debug!(chat_id = chat_id.0, sent = handles.len(), "view presented");

        self.replace_view(chat_id, handles.clone(), transport).await;
        handles
    }
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;

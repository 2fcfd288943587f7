use std::{collections::VecDeque, sync::Arc};

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::{
    domain::{ChatId, MessageHandle},
    protocol::ViewMessage,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::ChatTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    View,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub handle: MessageHandle,
    pub kind: SentKind,
    pub message: ViewMessage,
}

/// Messages and deletions kept per transport; older records are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

#[derive(Default)]
struct MemoryState {
    next_handle: i64,
    history_limit: usize,
    sent: VecDeque<SentMessage>,
    deleted: VecDeque<(ChatId, MessageHandle)>,
    channel_attempts: u32,
    failing_channel_sends: u32,
    channel_down: bool,
    deletes_fail: bool,
}

/// Transport that keeps recent traffic in memory. Used for dry runs without
/// a bot token, and as the scripted double in tests.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                history_limit: limit.max(1),
                ..MemoryState::default()
            })),
        }
    }

    /// The next `count` channel sends fail, later ones succeed.
    pub async fn fail_next_channel_sends(&self, count: u32) {
        self.inner.lock().await.failing_channel_sends = count;
    }

    pub async fn set_channel_down(&self, down: bool) {
        self.inner.lock().await.channel_down = down;
    }

    pub async fn set_deletes_fail(&self, fail: bool) {
        self.inner.lock().await.deletes_fail = fail;
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().await.sent.iter().cloned().collect()
    }

    pub async fn sent_to(&self, chat_id: ChatId) -> Vec<SentMessage> {
        self.inner
            .lock()
            .await
            .sent
            .iter()
            .filter(|sent| sent.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub async fn deleted(&self) -> Vec<(ChatId, MessageHandle)> {
        self.inner.lock().await.deleted.iter().cloned().collect()
    }

    pub async fn channel_attempts(&self) -> u32 {
        self.inner.lock().await.channel_attempts
    }

    fn record(
        state: &mut MemoryState,
        chat_id: ChatId,
        kind: SentKind,
        message: &ViewMessage,
    ) -> MessageHandle {
        state.next_handle += 1;
        let handle = MessageHandle(state.next_handle);
        push_bounded(
            &mut state.sent,
            state.history_limit,
            SentMessage {
                chat_id,
                handle,
                kind,
                message: message.clone(),
            },
        );
        info!(chat_id = chat_id.0, handle = handle.0, kind = ?kind, text = %message.text, "outbound message");
        handle
    }
}

fn push_bounded<T>(records: &mut VecDeque<T>, limit: usize, record: T) {
    if records.len() >= limit {
        records.pop_front();
    }
    records.push_back(record);
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn send_rendered_view(
        &self,
        chat_id: ChatId,
        message: &ViewMessage,
    ) -> Result<MessageHandle> {
        let mut state = self.inner.lock().await;
        Ok(Self::record(&mut state, chat_id, SentKind::View, message))
    }

    async fn delete_message(&self, chat_id: ChatId, handle: MessageHandle) -> Result<()> {
        let mut state = self.inner.lock().await;
        let limit = state.history_limit;
        push_bounded(&mut state.deleted, limit, (chat_id, handle));
        if state.deletes_fail {
            bail!("message {} can't be deleted", handle.0);
        }
        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel_id: ChatId,
        message: &ViewMessage,
    ) -> Result<MessageHandle> {
        let mut state = self.inner.lock().await;
        state.channel_attempts += 1;
        if state.channel_down {
            bail!("channel {} unreachable", channel_id.0);
        }
        if state.failing_channel_sends > 0 {
            state.failing_channel_sends -= 1;
            bail!("channel {} timed out", channel_id.0);
        }
        Ok(Self::record(&mut state, channel_id, SentKind::Channel, message))
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;

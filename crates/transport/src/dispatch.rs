use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::{
    domain::{ChatId, MessageHandle},
    error::{OrderingError, OrderingResult},
    protocol::ViewMessage,
};
use tracing::{error, info, warn};

use crate::ChatTransport;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the failed attempt `attempt_index` (0-based):
    /// `base_delay * 2^attempt_index`.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    Attempting(u32),
    Delivered(MessageHandle),
    Exhausted,
}

impl DeliveryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered(_) | Self::Exhausted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(MessageHandle),
    Exhausted { last_error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    pub waits: Vec<Duration>,
    /// Every state the sequence passed through, `Idle` first.
    pub states: Vec<DeliveryState>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered(_))
    }

    pub fn into_result(self) -> OrderingResult<MessageHandle> {
        match self.outcome {
            DeliveryOutcome::Delivered(handle) => Ok(handle),
            DeliveryOutcome::Exhausted { .. } => Err(OrderingError::NotificationExhausted {
                attempts: self.attempts,
            }),
        }
    }
}

/// Pushes messages to the staff channel with bounded exponential backoff.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn ChatTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        transport: Arc<dyn ChatTransport>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Runs the attempt sequence to a terminal state. Failure is reported,
    /// never raised.
    pub async fn notify(&self, target: ChatId, payload: &ViewMessage) -> DeliveryReport {
        let mut state = DeliveryState::Idle;
        let mut states = vec![state];
        let mut waits = Vec::new();
        let mut attempts = 0;
        let mut last_error = String::new();

        while !state.is_terminal() {
            state = match state {
                DeliveryState::Idle => DeliveryState::Attempting(0),
                DeliveryState::Attempting(attempt) => {
                    attempts = attempt + 1;
                    match self.transport.send_to_channel(target, payload).await {
                        Ok(handle) => {
                            info!(chat_id = target.0, attempt = attempts, "notification delivered");
                            DeliveryState::Delivered(handle)
                        }
                        Err(err) if attempts >= self.policy.max_attempts => {
                            last_error = err.to_string();
                            error!(
                                chat_id = target.0,
                                attempts,
                                error = %last_error,
                                "all notification attempts failed"
                            );
                            DeliveryState::Exhausted
                        }
                        Err(err) => {
                            let delay = self.policy.delay_for(attempt);
                            warn!(
                                chat_id = target.0,
                                attempt = attempts,
                                error = %err,
                                retry_in_ms = delay.as_millis() as u64,
                                "notification attempt failed; retrying"
                            );
                            self.sleeper.sleep(delay).await;
                            waits.push(delay);
                            DeliveryState::Attempting(attempt + 1)
                        }
                    }
                }
                terminal => terminal,
            };
            states.push(state);
        }

        let outcome = match state {
            DeliveryState::Delivered(handle) => DeliveryOutcome::Delivered(handle),
            _ => DeliveryOutcome::Exhausted { last_error },
        };
        DeliveryReport {
            outcome,
            attempts,
            waits,
            states,
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;

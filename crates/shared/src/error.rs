use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::OrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad user input; re-prompt or fall back to a default.
    InvalidInput,
    /// Stale or duplicate staff action; nothing changes.
    StaleAction,
    /// The user asked for something the current state cannot satisfy.
    Sequencing,
    /// The order exists but staff were not reached.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("quantity must be a positive number, got {0}")]
    InvalidQuantity(i64),
    #[error("unknown order {0}")]
    UnknownOrder(OrderId),
    #[error("order {0} is no longer pending")]
    NotPending(OrderId),
    #[error("cart is empty")]
    EmptyCart,
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("no item {index} in category {category:?}")]
    IndexOutOfRange { category: String, index: usize },
    #[error("staff notification failed after {attempts} attempts")]
    NotificationExhausted { attempts: u32 },
}

impl OrderingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::InvalidQuantity(_) => ErrorKind::InvalidInput,
            Self::UnknownOrder(_) | Self::NotPending(_) => ErrorKind::StaleAction,
            Self::EmptyCart | Self::UnknownCategory(_) | Self::IndexOutOfRange { .. } => {
                ErrorKind::Sequencing
            }
            Self::NotificationExhausted { .. } => ErrorKind::Degraded,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type OrderingResult<T> = Result<T, OrderingError>;

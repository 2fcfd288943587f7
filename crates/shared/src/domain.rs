use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ChatId);
id_newtype!(UserId);
id_newtype!(MessageHandle);

/// Short order identifier shown to customers and staff.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sessions are scoped to a user inside a chat, so the same person has
/// independent state in a private chat and in the staff group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl SessionKey {
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Smallest currency unit, always positive.
    pub price: u64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Position of an item inside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub category: String,
    pub index: usize,
}

impl ItemRef {
    pub fn new(category: impl Into<String>, index: usize) -> Self {
        Self {
            category: category.into(),
            index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub item_ref: ItemRef,
    pub item: Item,
    pub quantity: u32,
}

impl CartEntry {
    /// Saturates instead of wrapping; catalog prices are not bounded.
    pub fn line_total(&self) -> u64 {
        self.item.price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub chat_id: ChatId,
    pub customer_name: String,
    pub entries: Vec<CartEntry>,
    pub total: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

pub fn cart_total(entries: &[CartEntry]) -> u64 {
    entries
        .iter()
        .map(CartEntry::line_total)
        .fold(0, u64::saturating_add)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use shared::{
    domain::{CartEntry, Item, ItemRef, OrderId, SessionKey, UserId},
    error::{OrderingError, OrderingResult},
};
use tokio::sync::Mutex;

/// What the next free-text message from this session means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Browsing,
    AwaitingQuantity(ItemRef),
    AwaitingComment,
    AwaitingCancelReason(OrderId),
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    cart: Vec<CartEntry>,
    active_category: Option<String>,
    mode: SelectionMode,
}

impl SessionState {
    pub fn cart(&self) -> &[CartEntry] {
        &self.cart
    }

    /// Replaces the cart. Rejects the whole list, leaving the cart as it
    /// was, if any entry has a zero quantity.
    pub fn set_cart(&mut self, entries: Vec<CartEntry>) -> OrderingResult<()> {
        if entries.iter().any(|entry| entry.quantity == 0) {
            return Err(OrderingError::InvalidQuantity(0));
        }
        self.cart.clear();
        for entry in entries {
            // Going through the upsert keeps one entry per item.
            self.add_or_update_entry(entry.item_ref, entry.item, i64::from(entry.quantity))?;
        }
        Ok(())
    }

    /// Inserts the item or overwrites its quantity. Non-positive quantities
    /// leave the cart untouched.
    pub fn add_or_update_entry(
        &mut self,
        item_ref: ItemRef,
        item: Item,
        quantity: i64,
    ) -> OrderingResult<()> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|quantity| *quantity > 0)
            .ok_or(OrderingError::InvalidQuantity(quantity))?;

        match self.cart.iter_mut().find(|entry| entry.item_ref == item_ref) {
            Some(entry) => {
                entry.item = item;
                entry.quantity = quantity;
            }
            None => self.cart.push(CartEntry {
                item_ref,
                item,
                quantity,
            }),
        }
        Ok(())
    }

    pub fn quantity_of(&self, item_ref: &ItemRef) -> Option<u32> {
        self.cart
            .iter()
            .find(|entry| &entry.item_ref == item_ref)
            .map(|entry| entry.quantity)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    pub fn snapshot_cart(&self) -> Vec<CartEntry> {
        self.cart.clone()
    }

    pub fn mode(&self) -> &SelectionMode {
        &self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Returns the current mode and drops back to browsing.
    pub fn take_mode(&mut self) -> SelectionMode {
        std::mem::take(&mut self.mode)
    }

    pub fn active_category(&self) -> Option<&str> {
        self.active_category.as_deref()
    }

    pub fn set_active_category(&mut self, category: Option<String>) {
        self.active_category = category;
    }
}

#[derive(Default)]
struct SessionStoreState {
    sessions: HashMap<SessionKey, SessionState>,
    seen_users: HashSet<UserId>,
}

/// All live sessions. Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionStoreState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the session for `key`, creating it on first use.
    pub async fn with_session<R>(
        &self,
        key: SessionKey,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> R {
        let mut guard = self.inner.lock().await;
        f(guard.sessions.entry(key).or_default())
    }

    pub async fn snapshot(&self, key: SessionKey) -> SessionState {
        self.inner
            .lock()
            .await
            .sessions
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Records first contact; true when the user had not been seen before.
    pub async fn mark_seen(&self, user_id: UserId) -> bool {
        self.inner.lock().await.seen_users.insert(user_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use shared::{
    domain::{cart_total, CartEntry, ChatId, Order, OrderId, OrderStatus, UserId},
    error::{OrderingError, OrderingResult},
};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

const ORDER_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanceledOrder {
    pub order: Order,
    pub reason: String,
}

/// Pending orders shared by the customer and staff flows. Orders leave the
/// ledger as soon as they are completed or canceled.
#[derive(Clone, Default)]
pub struct OrderLedger {
    orders: Arc<Mutex<HashMap<OrderId, Order>>>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(
        &self,
        customer_id: UserId,
        chat_id: ChatId,
        customer_name: &str,
        cart: Vec<CartEntry>,
    ) -> OrderingResult<OrderId> {
        if cart.is_empty() {
            return Err(OrderingError::EmptyCart);
        }

        let total = cart_total(&cart);
        let mut orders = self.orders.lock().await;
        let order_id = loop {
            let candidate = new_order_id();
            if !orders.contains_key(&candidate) {
                break candidate;
            }
        };

        orders.insert(
            order_id.clone(),
            Order {
                order_id: order_id.clone(),
                customer_id,
                chat_id,
                customer_name: customer_name.to_string(),
                entries: cart,
                total,
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            },
        );
        info!(%order_id, customer_id = customer_id.0, total, "order submitted");
        Ok(order_id)
    }

    pub async fn get(&self, order_id: &OrderId) -> OrderingResult<Order> {
        self.orders
            .lock()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| OrderingError::UnknownOrder(order_id.clone()))
    }

    pub async fn complete(&self, order_id: &OrderId) -> OrderingResult<Order> {
        let mut order = self.take_pending(order_id).await?;
        order.status = OrderStatus::Completed;
        info!(%order_id, "order completed");
        Ok(order)
    }

    pub async fn cancel(&self, order_id: &OrderId, reason: &str) -> OrderingResult<CanceledOrder> {
        let mut order = self.take_pending(order_id).await?;
        order.status = OrderStatus::Canceled;
        info!(%order_id, reason, "order canceled");
        Ok(CanceledOrder {
            order,
            reason: reason.to_string(),
        })
    }

    pub async fn pending(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.lock().await.values().cloned().collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }

    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Check and removal happen under one lock, so only one staff action can
    /// win for a given order.
    async fn take_pending(&self, order_id: &OrderId) -> OrderingResult<Order> {
        let mut orders = self.orders.lock().await;
        let status = orders
            .get(order_id)
            .map(|order| order.status)
            .ok_or_else(|| OrderingError::UnknownOrder(order_id.clone()))?;
        if status != OrderStatus::Pending {
            return Err(OrderingError::NotPending(order_id.clone()));
        }
        orders
            .remove(order_id)
            .ok_or_else(|| OrderingError::UnknownOrder(order_id.clone()))
    }
}

fn new_order_id() -> OrderId {
    let raw = Uuid::new_v4().simple().to_string();
    OrderId(raw[..ORDER_ID_LEN].to_string())
}

#[cfg(test)]
#[path = "tests/ledger_tests.rs"]
mod tests;

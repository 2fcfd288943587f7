//! Text and keyboards for every view the assistant shows.

use shared::{
    domain::{CartEntry, ItemRef, Order, OrderId},
    error::{ErrorKind, OrderingError},
    protocol::{Button, CallbackAction, Reply, ViewMessage},
};
use storage::{Catalog, Category};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Venue {
    pub name: String,
    pub currency: String,
}

impl Venue {
    pub fn money(&self, amount: u64) -> String {
        format!("{} {amount}", self.currency)
    }
}

pub fn welcome(venue: &Venue, display_name: &str) -> ViewMessage {
    let name = if display_name.trim().is_empty() {
        "there"
    } else {
        display_name.trim()
    };
    ViewMessage::text(format!(
        "Welcome to {}, {name}! 🎉\nUse /menu to see what's on offer or /help for more options.",
        venue.name
    ))
}

pub fn help() -> ViewMessage {
    ViewMessage::text(
        "Here's what I can do:\n\
         /menu - View the menu\n\
         /order - Check or confirm your order\n\
         /comment - Leave feedback\n\
         /help - Show this message",
    )
}

pub fn menu(catalog: &Catalog) -> ViewMessage {
    catalog.categories().iter().fold(
        ViewMessage::text("🍽️ What would you like to see?"),
        |message, category| {
            message.with_button(Button::new(
                &category.name,
                &CallbackAction::OpenCategory(category.name.clone()),
            ))
        },
    )
}

pub fn category(venue: &Venue, category: &Category, cart: &[CartEntry]) -> ViewMessage {
    let mut message = ViewMessage::text(format!("🍴 {} Menu 🍴\n\nSelect items:", category.name));
    for (index, item) in category.items.iter().enumerate() {
        let item_ref = ItemRef::new(category.name.clone(), index);
        let quantity = cart
            .iter()
            .find(|entry| entry.item_ref == item_ref)
            .map(|entry| entry.quantity);
        let label = match quantity {
            Some(quantity) => format!("✓ {} x{quantity} ({})", item.name, venue.money(item.price)),
            None => format!("{} ({})", item.name, venue.money(item.price)),
        };
        message = message.with_button(Button::new(label, &CallbackAction::ToggleItem(item_ref)));
    }
    message.with_button(Button::new(
        "Done",
        &CallbackAction::CategoryDone(category.name.clone()),
    ))
}

pub fn quantity_prompt(item_name: &str) -> ViewMessage {
    ViewMessage::text(format!(
        "How many {item_name}s would you like? Enter a number (default is 1):"
    ))
}

fn item_lines(venue: &Venue, entries: &[CartEntry], bullet: &str) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{bullet} {} x{} ({})\n",
                entry.item.name,
                entry.quantity,
                venue.money(entry.line_total())
            )
        })
        .collect()
}

pub fn cart_summary(venue: &Venue, cart: &[CartEntry]) -> ViewMessage {
    let total = shared::domain::cart_total(cart);
    ViewMessage::text(format!(
        "🛒 Your Order:\n{}\nTotal: {}",
        item_lines(venue, cart, "-"),
        venue.money(total)
    ))
    .with_button(Button::new("Confirm Order", &CallbackAction::ConfirmOrder))
    .with_button(Button::new("Cancel Order", &CallbackAction::ClearOrder))
}

pub fn staff_order(venue: &Venue, order: &Order) -> ViewMessage {
    ViewMessage::text(format!(
        "🔔 New Order from {} (User ID: {}):\nOrder ID: {}\n{}\nTotal: {}",
        order.customer_name,
        order.customer_id,
        order.order_id,
        item_lines(venue, &order.entries, "-"),
        venue.money(order.total)
    ))
    .with_button(Button::new(
        "Complete",
        &CallbackAction::CompleteOrder(order.order_id.clone()),
    ))
    .with_button(Button::new(
        "Cancel",
        &CallbackAction::CancelOrder(order.order_id.clone()),
    ))
}

pub fn order_confirmed(venue: &Venue, order: &Order) -> ViewMessage {
    ViewMessage::text(format!(
        "✅ Order confirmed! (ID: {})\nYour orders:\n{}Total: {}\nYour items are being prepared. Enjoy your time at {}! 🍹",
        order.order_id,
        item_lines(venue, &order.entries, "     ✓"),
        venue.money(order.total),
        venue.name
    ))
}

pub fn order_unannounced(order_id: &OrderId) -> ViewMessage {
    ViewMessage::text(format!(
        "Order prepared (ID: {order_id}), but we couldn't notify staff. Please inform them manually."
    ))
}

pub fn already_handled(order_id: &OrderId) -> Reply {
    Reply::text(format!("Order ID: {order_id} was already handled."))
}

/// User-facing message for a handled error.
pub fn error_reply(err: &OrderingError) -> Reply {
    match err.kind() {
        ErrorKind::Degraded => warn!(%err, "degraded reply"),
        kind => debug!(?kind, %err, "error reply"),
    }
    match err {
        OrderingError::InvalidInput(_) => Reply::text("Sorry, I didn't understand that. Use /menu to start again."),
        OrderingError::InvalidQuantity(_) => Reply::text("Invalid number, defaulting to 1."),
        OrderingError::UnknownOrder(order_id) | OrderingError::NotPending(order_id) => {
            already_handled(order_id)
        }
        OrderingError::EmptyCart => Reply::text("No order to confirm! Use /menu to start ordering."),
        OrderingError::UnknownCategory(name) => {
            Reply::text(format!("We don't have a {name} menu. Use /menu to see what's on offer."))
        }
        OrderingError::IndexOutOfRange { category, .. } => Reply::text(format!(
            "That item is no longer on the {category} menu. Use /menu to see what's on offer."
        )),
        OrderingError::NotificationExhausted { .. } => Reply::text(
            "Your order is recorded, but we couldn't notify staff. Please inform them manually.",
        ),
    }
}

use std::sync::Arc;

use shared::{
    domain::{CartEntry, ChatId, ItemRef, OrderId, SessionKey, UserId},
    error::OrderingResult,
    protocol::{CallbackAction, ChatUpdate, Command, Reply, View, ViewMessage},
};
use storage::{Catalog, OrderLedger, SelectionMode, SessionStore};
use tracing::{debug, info, warn};
use transport::NotificationDispatcher;

pub mod render;

pub use render::Venue;

const NO_REASON: &str = "No reason provided.";

/// Everything a handler needs. Built once at startup and cloned into every
/// request; the stores inside share state across clones.
#[derive(Clone)]
pub struct OrderingContext {
    pub catalog: Arc<Catalog>,
    pub sessions: SessionStore,
    pub ledger: OrderLedger,
    pub dispatcher: NotificationDispatcher,
    pub staff_chat: ChatId,
    pub venue: Venue,
}

impl OrderingContext {
    pub fn new(
        catalog: Catalog,
        dispatcher: NotificationDispatcher,
        staff_chat: ChatId,
        venue: Venue,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: SessionStore::new(),
            ledger: OrderLedger::new(),
            dispatcher,
            staff_chat,
            venue,
        }
    }

    fn is_staff_chat(&self, chat_id: ChatId) -> bool {
        chat_id == self.staff_chat
    }
}

pub async fn handle_update(ctx: &OrderingContext, update: ChatUpdate) -> Option<Reply> {
    match update {
        ChatUpdate::Command {
            chat_id,
            user_id,
            display_name,
            command,
        } => {
            info!(chat_id = chat_id.0, ?command, "command used");
            let reply = match command {
                Command::Start => on_start(ctx, chat_id, user_id, &display_name).await,
                Command::Help => on_help(),
                Command::Menu => on_open_menu(ctx, chat_id, user_id).await,
                Command::Order => on_view_order(ctx, chat_id, user_id).await,
                Command::Comment => on_comment(ctx, chat_id, user_id).await,
            };
            Some(reply)
        }
        ChatUpdate::Callback {
            chat_id,
            user_id,
            display_name,
            data,
        } => {
            let action = match CallbackAction::parse(&data) {
                Ok(action) => action,
                Err(err) => {
                    warn!(chat_id = chat_id.0, %data, "ignoring malformed callback");
                    return Some(render::error_reply(&err));
                }
            };
            Some(on_callback(ctx, chat_id, user_id, &display_name, action).await)
        }
        ChatUpdate::Text {
            chat_id,
            user_id,
            text,
        } => on_text(ctx, chat_id, user_id, &text).await,
    }
}

pub async fn on_callback(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    display_name: &str,
    action: CallbackAction,
) -> Reply {
    match action {
        CallbackAction::OpenCategory(category) => {
            on_select_category(ctx, chat_id, user_id, &category).await
        }
        CallbackAction::ToggleItem(item_ref) => on_toggle_item(ctx, chat_id, user_id, &item_ref).await,
        CallbackAction::CategoryDone(category) => {
            on_category_done(ctx, chat_id, user_id, &category).await
        }
        CallbackAction::ConfirmOrder => on_submit_order(ctx, chat_id, user_id, display_name).await,
        CallbackAction::ClearOrder => on_clear_order(ctx, chat_id, user_id).await,
        CallbackAction::CompleteOrder(order_id) => {
            on_staff_complete(ctx, chat_id, user_id, &order_id).await
        }
        CallbackAction::CancelOrder(order_id) => {
            on_staff_cancel_requested(ctx, chat_id, user_id, &order_id).await
        }
    }
}

pub async fn on_start(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    display_name: &str,
) -> Reply {
    if ctx.sessions.mark_seen(user_id).await {
        info!(chat_id = chat_id.0, user_id = user_id.0, display_name, "new customer");
    }
    Reply::message(render::welcome(&ctx.venue, display_name))
}

pub fn on_help() -> Reply {
    Reply::message(render::help())
}

pub async fn on_open_menu(ctx: &OrderingContext, chat_id: ChatId, user_id: UserId) -> Reply {
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.set_mode(SelectionMode::Browsing);
            session.set_active_category(None);
        })
        .await;
    Reply::message(render::menu(&ctx.catalog))
}

pub async fn on_select_category(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    category: &str,
) -> Reply {
    let category = match ctx.catalog.category(category) {
        Ok(category) => category,
        Err(err) => return render::error_reply(&err),
    };
    let cart = ctx
        .sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.set_mode(SelectionMode::Browsing);
            session.set_active_category(Some(category.name.clone()));
            session.snapshot_cart()
        })
        .await;
    Reply::message(render::category(&ctx.venue, category, &cart))
}

pub async fn on_toggle_item(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    item_ref: &ItemRef,
) -> Reply {
    let (item_ref, item) = match ctx.catalog.resolve(item_ref) {
        Ok(resolved) => resolved,
        Err(err) => return render::error_reply(&err),
    };
    let prompt = render::quantity_prompt(&item.name);
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.set_active_category(Some(item_ref.category.clone()));
            session.set_mode(SelectionMode::AwaitingQuantity(item_ref));
        })
        .await;
    Reply::message(prompt)
}

struct QuantitySet {
    item_ref: ItemRef,
    item_name: String,
    quantity: u32,
    defaulted: bool,
}

/// Applies a typed quantity to the item the session is waiting on. Anything
/// that is not a positive whole number falls back to 1.
pub async fn on_quantity_text(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> Reply {
    let catalog = ctx.catalog.clone();
    let requested = text.trim().parse::<i64>().ok();

    let outcome = ctx
        .sessions
        .with_session(
            SessionKey::new(chat_id, user_id),
            |session| -> OrderingResult<Option<(QuantitySet, Vec<CartEntry>)>> {
                let SelectionMode::AwaitingQuantity(pending) = session.mode().clone() else {
                    return Ok(None);
                };
                session.take_mode();
                let (item_ref, item) = catalog.resolve(&pending)?;

                let accepted = requested.and_then(|quantity| {
                    session
                        .add_or_update_entry(item_ref.clone(), item.clone(), quantity)
                        .ok()
                        .map(|()| quantity as u32)
                });
                let (quantity, defaulted) = match accepted {
                    Some(quantity) => (quantity, false),
                    None => {
                        session.add_or_update_entry(item_ref.clone(), item.clone(), 1)?;
                        (1, true)
                    }
                };
                Ok(Some((
                    QuantitySet {
                        item_ref,
                        item_name: item.name.clone(),
                        quantity,
                        defaulted,
                    },
                    session.snapshot_cart(),
                )))
            },
        )
        .await;

    let (set, cart) = match outcome {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return Reply::text("Pick an item from /menu first."),
        Err(err) => return render::error_reply(&err),
    };
    debug!(
        chat_id = chat_id.0,
        item = %set.item_name,
        quantity = set.quantity,
        defaulted = set.defaulted,
        "quantity set"
    );

    let mut view = View::default();
    if set.defaulted {
        view = view.push(ViewMessage::text("Invalid number, defaulting to 1."));
    }
    let summary = format!("Set quantity to {} for {}.", set.quantity, set.item_name);
    let message = match ctx.catalog.category(&set.item_ref.category) {
        Ok(category) => {
            let keyboard = render::category(&ctx.venue, category, &cart).keyboard;
            ViewMessage {
                text: summary,
                keyboard,
            }
        }
        Err(_) => ViewMessage::text(summary),
    };
    Reply {
        view: view.push(message),
        forwards: Vec::new(),
    }
}

pub async fn on_category_done(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    category: &str,
) -> Reply {
    let category = match ctx.catalog.category(category) {
        Ok(category) => category.name.clone(),
        Err(err) => return render::error_reply(&err),
    };
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.set_active_category(None);
        })
        .await;
    Reply::text(format!(
        "Items from {category} added to your order!\nUse /order to view or confirm."
    ))
}

pub async fn on_view_order(ctx: &OrderingContext, chat_id: ChatId, user_id: UserId) -> Reply {
    let cart = ctx
        .sessions
        .snapshot(SessionKey::new(chat_id, user_id))
        .await
        .snapshot_cart();
    if cart.is_empty() {
        return Reply::text("You haven't ordered anything yet! Use /menu to start.");
    }
    Reply::message(render::cart_summary(&ctx.venue, &cart))
}

pub async fn on_clear_order(ctx: &OrderingContext, chat_id: ChatId, user_id: UserId) -> Reply {
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.clear_cart();
            session.set_mode(SelectionMode::Browsing);
        })
        .await;
    Reply::text("🗑️ Order canceled! Start fresh with /menu.")
}

/// Records the cart as an order and tells staff about it. The cart is taken
/// out of the session before the ledger write, so a concurrent edit cannot
/// leak into the order.
pub async fn on_submit_order(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    display_name: &str,
) -> Reply {
    info!(chat_id = chat_id.0, user_id = user_id.0, "order confirmation requested");
    let cart = ctx
        .sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            let cart = session.snapshot_cart();
            session.clear_cart();
            cart
        })
        .await;

    let order_id = match ctx.ledger.submit(user_id, chat_id, display_name, cart).await {
        Ok(order_id) => order_id,
        Err(err) => return render::error_reply(&err),
    };
    let order = match ctx.ledger.get(&order_id).await {
        Ok(order) => order,
        // Staff may already have acted on it in between.
        Err(err) => return render::error_reply(&err),
    };

    let report = ctx
        .dispatcher
        .notify(ctx.staff_chat, &render::staff_order(&ctx.venue, &order))
        .await;
    match report.into_result() {
        Ok(_) => Reply::message(render::order_confirmed(&ctx.venue, &order)),
        Err(err) => {
            warn!(%order_id, %err, "order recorded without staff notification");
            Reply::message(render::order_unannounced(&order_id))
        }
    }
}

fn staff_only(chat_id: ChatId) -> Reply {
    warn!(chat_id = chat_id.0, "staff action outside the staff chat ignored");
    Reply::text("Only staff can do that.")
}

pub async fn on_staff_complete(
    ctx: &OrderingContext,
    chat_id: ChatId,
    staff_id: UserId,
    order_id: &OrderId,
) -> Reply {
    if !ctx.is_staff_chat(chat_id) {
        return staff_only(chat_id);
    }
    match ctx.ledger.complete(order_id).await {
        Ok(order) => {
            info!(%order_id, staff_id = staff_id.0, "order marked completed");
            Reply::text(format!("✅ Order ID: {order_id} marked as completed.")).forward(
                order.chat_id,
                ViewMessage::text(format!(
                    "🎉 Your order (ID: {order_id}) is ready! Enjoy your time at {}.",
                    ctx.venue.name
                )),
            )
        }
        Err(err) => {
            info!(%order_id, %err, "stale complete action");
            render::error_reply(&err)
        }
    }
}

/// Staff pressed Cancel: remember which order the next text in the staff
/// chat explains.
pub async fn on_staff_cancel_requested(
    ctx: &OrderingContext,
    chat_id: ChatId,
    staff_id: UserId,
    order_id: &OrderId,
) -> Reply {
    if !ctx.is_staff_chat(chat_id) {
        return staff_only(chat_id);
    }
    if let Err(err) = ctx.ledger.get(order_id).await {
        return render::error_reply(&err);
    }
    ctx.sessions
        .with_session(SessionKey::new(chat_id, staff_id), |session| {
            session.set_mode(SelectionMode::AwaitingCancelReason(order_id.clone()));
        })
        .await;
    Reply::text(format!(
        "Please enter the reason for canceling Order ID: {order_id}:"
    ))
}

pub async fn on_staff_cancel(
    ctx: &OrderingContext,
    chat_id: ChatId,
    staff_id: UserId,
    order_id: &OrderId,
    reason_text: &str,
) -> Reply {
    if !ctx.is_staff_chat(chat_id) {
        return staff_only(chat_id);
    }
    ctx.sessions
        .with_session(SessionKey::new(chat_id, staff_id), |session| {
            if session.mode() == &SelectionMode::AwaitingCancelReason(order_id.clone()) {
                session.take_mode();
            }
        })
        .await;

    let reason = match reason_text.trim() {
        "" => NO_REASON,
        reason => reason,
    };
    match ctx.ledger.cancel(order_id, reason).await {
        Ok(canceled) => Reply::text(format!(
            "Order ID: {order_id} canceled. Reason sent to user: {}",
            canceled.reason
        ))
        .forward(
            canceled.order.chat_id,
            ViewMessage::text(format!(
                "Try again, your order (ID: {order_id}) was canceled. Reason: {}",
                canceled.reason
            )),
        ),
        Err(err) => {
            info!(%order_id, %err, "stale cancel action");
            render::error_reply(&err)
        }
    }
}

pub async fn on_comment(ctx: &OrderingContext, chat_id: ChatId, user_id: UserId) -> Reply {
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            session.set_mode(SelectionMode::AwaitingComment);
        })
        .await;
    Reply::text("How was the service? Please type your feedback below.")
}

pub async fn on_free_text_comment(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> Reply {
    let text = text.trim();
    if text.is_empty() {
        return Reply::text("Please type your feedback below.");
    }
    ctx.sessions
        .with_session(SessionKey::new(chat_id, user_id), |session| {
            if session.mode() == &SelectionMode::AwaitingComment {
                session.take_mode();
            }
        })
        .await;
    info!(chat_id = chat_id.0, user_id = user_id.0, "customer feedback received");
    Reply::text("Thanks for your feedback! We'll pass it along to the team. 😊").forward(
        ctx.staff_chat,
        ViewMessage::text(format!("💬 Feedback from User ID {user_id}:\n{text}")),
    )
}

/// Routes free text according to what the session is waiting for. Text
/// nobody asked for gets no reply.
pub async fn on_text(
    ctx: &OrderingContext,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> Option<Reply> {
    let mode = ctx
        .sessions
        .snapshot(SessionKey::new(chat_id, user_id))
        .await
        .mode()
        .clone();

    match mode {
        SelectionMode::AwaitingComment => {
            Some(on_free_text_comment(ctx, chat_id, user_id, text).await)
        }
        SelectionMode::AwaitingQuantity(_) => {
            Some(on_quantity_text(ctx, chat_id, user_id, text).await)
        }
        SelectionMode::AwaitingCancelReason(order_id) if ctx.is_staff_chat(chat_id) => {
            Some(on_staff_cancel(ctx, chat_id, user_id, &order_id, text).await)
        }
        SelectionMode::AwaitingCancelReason(_) | SelectionMode::Browsing => {
            debug!(chat_id = chat_id.0, "unsolicited text ignored");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

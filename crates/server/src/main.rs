use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use server_api::{handle_update, OrderingContext};
use shared::{domain::Order, protocol::ChatUpdate};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transport::{BotApiTransport, ChatTransport, MemoryTransport, NotificationDispatcher};

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

#[derive(Debug, Serialize)]
struct UpdateAck {
    handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    headline: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let staff_chat = settings.staff_chat()?;
    let catalog = settings.load_catalog()?;

    let transport: Arc<dyn ChatTransport> = match &settings.bot_token {
        Some(token) => Arc::new(BotApiTransport::new(&settings.bot_api_url, token)?),
        None => {
            warn!("BOT_TOKEN is not set; running with an in-memory transport");
            Arc::new(MemoryTransport::new())
        }
    };
    let dispatcher = NotificationDispatcher::new(transport.clone(), settings.retry_policy());
    let ordering = OrderingContext::new(catalog, dispatcher, staff_chat, settings.venue());

    let app = build_router(Arc::new(AppState::new(ordering, transport)));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, staff_chat = staff_chat.0, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/updates", post(receive_update))
        .route("/orders", get(pending_orders))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn receive_update(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ChatUpdate>,
) -> Json<UpdateAck> {
    let chat_id = update.chat_id();
    let Some(reply) = handle_update(&state.ordering, update).await else {
        return Json(UpdateAck {
            handled: false,
            headline: None,
        });
    };

    state.deliver(chat_id, &reply).await;
    Json(UpdateAck {
        handled: true,
        headline: Some(reply.headline().to_string()),
    })
}

async fn pending_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.ordering.ledger.pending().await)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

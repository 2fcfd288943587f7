use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use server_api::Venue;
use shared::domain::ChatId;
use std::time::Duration;
use storage::Catalog;
use tower::ServiceExt;
use transport::{RetryPolicy, SentKind};

const STAFF: i64 = -100;
const CUSTOMER: i64 = 42;

fn test_app() -> (Router, MemoryTransport) {
    let memory = MemoryTransport::new();
    let transport: Arc<dyn ChatTransport> = Arc::new(memory.clone());
    let dispatcher =
        NotificationDispatcher::new(transport.clone(), RetryPolicy::new(3, Duration::ZERO));
    let ordering = OrderingContext::new(
        Catalog::default_menu(),
        dispatcher,
        ChatId(STAFF),
        Venue {
            name: "Playground Lounge".to_string(),
            currency: "ETB".to_string(),
        },
    );
    let app = build_router(Arc::new(AppState::new(ordering, transport)));
    (app, memory)
}

async fn post_update(app: &Router, update: Value) -> (StatusCode, Value) {
    let request = Request::post("/updates")
        .header("content-type", "application/json")
        .body(Body::from(update.to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn callback(chat_id: i64, user_id: i64, data: &str) -> Value {
    json!({
        "type": "callback",
        "payload": { "chat_id": chat_id, "user_id": user_id, "display_name": "Abebe", "data": data }
    })
}

fn text(chat_id: i64, user_id: i64, text: &str) -> Value {
    json!({
        "type": "text",
        "payload": { "chat_id": chat_id, "user_id": user_id, "text": text }
    })
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _memory) = test_app();
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn start_command_sends_welcome_to_the_chat() {
    let (app, memory) = test_app();
    let (status, ack) = post_update(
        &app,
        json!({
            "type": "command",
            "payload": { "chat_id": CUSTOMER, "user_id": CUSTOMER, "display_name": "Abebe", "command": "start" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["handled"], json!(true));
    assert!(ack["headline"]
        .as_str()
        .expect("headline")
        .starts_with("Welcome to Playground Lounge, Abebe!"));

    let sent = memory.sent_to(ChatId(CUSTOMER)).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, SentKind::View);
}

#[tokio::test]
async fn new_view_replaces_the_previous_one() {
    let (app, memory) = test_app();
    post_update(
        &app,
        json!({
            "type": "command",
            "payload": { "chat_id": CUSTOMER, "user_id": CUSTOMER, "command": "menu" }
        }),
    )
    .await;
    let first = memory.sent_to(ChatId(CUSTOMER)).await[0].handle;

    post_update(&app, callback(CUSTOMER, CUSTOMER, "menu_drinks")).await;

    assert_eq!(memory.deleted().await, vec![(ChatId(CUSTOMER), first)]);
}

#[tokio::test]
async fn unsolicited_text_is_acknowledged_but_not_handled() {
    let (app, memory) = test_app();
    let (status, ack) = post_update(&app, text(CUSTOMER, CUSTOMER, "hello?")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({ "handled": false }));
    assert!(memory.sent().await.is_empty());
}

#[tokio::test]
async fn malformed_update_is_rejected() {
    let (app, _memory) = test_app();
    let (status, _) = post_update(&app, json!({ "type": "telepathy", "payload": {} })).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn confirmed_order_is_listed_and_announced_to_staff() {
    let (app, memory) = test_app();

    post_update(&app, callback(CUSTOMER, CUSTOMER, "menu_drinks")).await;
    post_update(&app, callback(CUSTOMER, CUSTOMER, "toggle_Drinks_2")).await;
    post_update(&app, text(CUSTOMER, CUSTOMER, "2")).await;
    let (_, ack) = post_update(&app, callback(CUSTOMER, CUSTOMER, "order_confirm")).await;
    assert_eq!(ack["handled"], json!(true));

    let request = Request::get("/orders").body(Body::empty()).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let orders: Value = serde_json::from_slice(&bytes).expect("orders json");
    let orders = orders.as_array().expect("array");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total"], json!(6));
    assert_eq!(orders[0]["status"], json!("pending"));

    let staff = memory.sent_to(ChatId(STAFF)).await;
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].kind, SentKind::Channel);
    assert!(staff[0].message.text.starts_with("🔔 New Order from Abebe"));
}

#[tokio::test]
async fn staff_completion_forwards_a_ready_message_to_the_customer() {
    let (app, memory) = test_app();

    post_update(&app, callback(CUSTOMER, CUSTOMER, "toggle_Foods_4")).await;
    post_update(&app, text(CUSTOMER, CUSTOMER, "1")).await;
    post_update(&app, callback(CUSTOMER, CUSTOMER, "order_confirm")).await;

    let staff = memory.sent_to(ChatId(STAFF)).await;
    let complete = staff[0].message.keyboard[0][0].callback_data.clone();
    assert!(complete.starts_with("complete_"));

    let (_, ack) = post_update(&app, callback(STAFF, 7, &complete)).await;
    assert_eq!(ack["handled"], json!(true));

    let ready = memory
        .sent_to(ChatId(CUSTOMER))
        .await
        .into_iter()
        .filter(|sent| sent.kind == SentKind::Channel)
        .collect::<Vec<_>>();
    assert_eq!(ready.len(), 1);
    assert!(ready[0].message.text.contains("is ready!"));

    let request = Request::get("/orders").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(bytes.as_ref(), b"[]");
}

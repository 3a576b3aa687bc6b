//! HTTP API workflow with a real operator authenticator

use crate::fixtures::{queue_state, test_app_state, OPERATOR_EMAIL, OPERATOR_PASSWORD};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Duration as ChronoDuration;
use queue_display::clock::{Clock, ManualClock};
use queue_display::service::create_router;
use queue_display::store::{InMemoryQueueStore, MockQueueStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn login(app: &Router) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": OPERATOR_EMAIL, "password": OPERATOR_PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["email"], OPERATOR_EMAIL);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_operator_moves_queue_and_display_catches_up() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(InMemoryQueueStore::new());
    let state = test_app_state(store, clock.clone());
    state.start().await.unwrap();
    let app = create_router(state.clone());

    let token = login(&app).await;

    for _ in 0..4 {
        let response = send(&app, "POST", "/api/queue/increment", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = send(&app, "POST", "/api/queue/decrement", Some(&token), None).await;
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "applied");
    assert_eq!(body["state"]["queue_number"], 3);
    assert_eq!(body["frame"]["estimate_text"], "~30 minutes");

    // Public display still shows the last polled value
    let response = send(&app, "GET", "/api/queue", None, None).await;
    assert_eq!(body_json(response).await["queue_number"], 0);

    let response = send(&app, "POST", "/api/queue/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let frame = body_json(response).await;
    assert_eq!(frame["queue_number"], 3);
    assert_eq!(frame["freshness"]["label"], "just updated");

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_set_rejects_negative_numbers() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::with_state(queue_state(2, clock.now())));
    let state = test_app_state(store.clone(), clock);
    state.operator().refresh().await.unwrap();
    let app = create_router(state);
    let token = login(&app).await;

    let response = send(
        &app,
        "PUT",
        "/api/queue",
        Some(&token),
        Some(json!({ "queue_number": -5 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["requested"], -5);
    assert_eq!(body["frame"]["queue_number"], 2);
    assert_eq!(store.upsert_calls(), 0);
    assert_eq!(store.history_calls(), 0);
}

#[tokio::test]
async fn test_wrong_password_and_missing_token() {
    let clock = Arc::new(ManualClock::default());
    let app = create_router(test_app_state(Arc::new(InMemoryQueueStore::new()), clock));

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": OPERATOR_EMAIL, "password": "guess" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    for uri in [
        "/api/queue/increment",
        "/api/queue/decrement",
        "/api/queue/reset",
    ] {
        let response = send(&app, "POST", uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = send(&app, "GET", "/api/auth/session", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_expires_after_ttl() {
    let clock = Arc::new(ManualClock::default());
    let app = create_router(test_app_state(
        Arc::new(InMemoryQueueStore::new()),
        clock.clone(),
    ));
    let token = login(&app).await;

    let response = send(&app, "GET", "/api/auth/session", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(ChronoDuration::seconds(3601));

    let response = send(&app, "POST", "/api/queue/increment", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_store_outage_surfaces_in_health_and_api() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::new());
    store.set_fail_fetch(true);
    let state = test_app_state(store.clone(), clock);
    state.start().await.unwrap();
    let app = create_router(state.clone());

    let response = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = send(&app, "POST", "/api/queue/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    store.set_fail_fetch(false);
    let response = send(&app, "POST", "/api/queue/refresh", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/metrics", None, None).await;
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("queue_display_refreshes_total"));

    state.shutdown().await.unwrap();
}

//! Concurrent clients: many sessions served side by side from one router.
//!
//! Tests verify that simultaneous handshakes never share a session, and that
//! requests racing on one session are all answered without corrupting its state.

use std::sync::Arc;
use tokio::sync::Barrier;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mcp_session_hub::config::ServerConfig;
use mcp_session_hub::{create_router, AppState, SESSION_ID_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;

// ─── Helpers ───────────────────────────────────────────────────────────────

fn create_app() -> (AppState, Router) {
    let state = AppState::with_default_engine(ServerConfig::default());
    let app = create_router(state.clone());
    (state, app)
}

async fn post(app: &Router, session: Option<&str>, body: Value) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_ID_HEADER, id);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let header = response
        .headers()
        .get(SESSION_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, header, body)
}

async fn open_session(app: &Router, client: &str) -> String {
    let (status, header, _) = post(
        app,
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": client, "version": "1.0"}
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = header.expect("session id");

    let (status, _, _) = post(
        app,
        Some(&id),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    id
}

async fn call_tool(app: &Router, session: &str, id: i64, name: &str, args: Value) -> Value {
    let (status, _, body) = post(
        app,
        Some(session),
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": args}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn tool_json(reply: &Value) -> Value {
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_handshakes_yield_distinct_sessions() {
    let (state, app) = create_app();
    let clients = 50;
    let barrier = Arc::new(Barrier::new(clients));

    let handles: Vec<_> = (0..clients)
        .map(|i| {
            let app = app.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                open_session(&app, &format!("client-{i}")).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), clients);
    assert_eq!(state.registry.len().await, clients);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn sessions_keep_their_own_client_identity() {
    let (_state, app) = create_app();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let client = format!("agent-{i}");
                let session = open_session(&app, &client).await;
                (client, session)
            })
        })
        .collect();

    for handle in handles {
        let (client, session) = handle.await.unwrap();
        let info = tool_json(&call_tool(&app, &session, 1, "session_info", json!({})).await);
        assert_eq!(info["client"]["name"], client.as_str());
        assert_eq!(info["session_id"], session.as_str());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_requests_on_one_session_are_all_answered() {
    let (_state, app) = create_app();
    let session = open_session(&app, "racer").await;
    let requests = 40;
    let barrier = Arc::new(Barrier::new(requests));

    let handles: Vec<_> = (0..requests)
        .map(|i| {
            let app = app.clone();
            let session = session.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                let text = format!("message-{i}");
                let reply =
                    call_tool(&app, &session, i as i64 + 1, "echo", json!({"text": text})).await;
                assert_eq!(reply["id"], i as i64 + 1);
                assert_eq!(reply["result"]["content"][0]["text"], text.as_str());
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let info = tool_json(&call_tool(&app, &session, 999, "session_info", json!({})).await);
    // initialize + the echoes + this call
    assert_eq!(info["requests_handled"], requests as u64 + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn log_level_is_per_session() {
    let (_state, app) = create_app();
    let quiet = open_session(&app, "quiet").await;
    let chatty = open_session(&app, "chatty").await;

    let (status, _, _) = post(
        &app,
        Some(&quiet),
        json!({"jsonrpc": "2.0", "id": 5, "method": "logging/setLevel", "params": {"level": "error"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let quiet_info = tool_json(&call_tool(&app, &quiet, 6, "session_info", json!({})).await);
    let chatty_info = tool_json(&call_tool(&app, &chatty, 6, "session_info", json!({})).await);
    assert_eq!(quiet_info["log_level"], "error");
    assert_eq!(chatty_info["log_level"], "info");
}

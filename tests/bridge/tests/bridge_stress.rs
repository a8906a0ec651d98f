//! Stress: session churn with deletes, disconnects and requests interleaved.
//!
//! Every session must end up torn down exactly once, and the registry must
//! only ever contain sessions that are still reachable.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::future::join_all;
use mcp_session_hub::config::ServerConfig;
use mcp_session_hub::{create_router, AppState, SESSION_ID_HEADER};
use serde_json::json;
use tower::ServiceExt;

// ─── Helpers ───────────────────────────────────────────────────────────────

fn create_app() -> (AppState, Router) {
    let state = AppState::with_default_engine(ServerConfig::default());
    let app = create_router(state.clone());
    (state, app)
}

async fn send(app: &Router, method: &str, session: Option<&str>, body: Option<String>) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_ID_HEADER, id);
    }
    let body = body.map(Body::from).unwrap_or_else(Body::empty);
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn open_session(app: &Router) -> String {
    let init = json!({"jsonrpc": "2.0", "id": 0, "method": "initialize"}).to_string();
    let response = send(app, "POST", None, Some(init)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = response
        .headers()
        .get(SESSION_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let ready = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    assert_eq!(
        send(app, "POST", Some(&id), Some(ready)).await.status(),
        StatusCode::ACCEPTED
    );
    id
}

async fn ping(app: &Router, session: &str) -> StatusCode {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();
    send(app, "POST", Some(session), Some(body)).await.status()
}

async fn wait_for_empty(state: &AppState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !state.registry.is_empty().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "sessions left behind: {}",
            state.registry.len().await
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn churn_deletes_while_others_keep_working() {
    let (state, app) = create_app();

    let ids = join_all((0..100).map(|_| open_session(&app))).await;
    assert_eq!(state.registry.len().await, 100);

    let tasks: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let app = app.clone();
            let id = id.clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    assert_eq!(
                        send(&app, "DELETE", Some(&id), None).await.status(),
                        StatusCode::NO_CONTENT
                    );
                } else {
                    for _ in 0..5 {
                        assert_eq!(ping(&app, &id).await, StatusCode::OK);
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(state.registry.len().await, 50);
    for (i, id) in ids.iter().enumerate() {
        let expected = if i % 2 == 0 {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };
        assert_eq!(ping(&app, id).await, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn duplicate_deletes_race_safely() {
    let (state, app) = create_app();
    let ids = join_all((0..30).map(|_| open_session(&app))).await;

    let deletes = ids.iter().flat_map(|id| {
        let first = {
            let app = app.clone();
            let id = id.clone();
            tokio::spawn(async move { send(&app, "DELETE", Some(&id), None).await.status() })
        };
        let second = {
            let app = app.clone();
            let id = id.clone();
            tokio::spawn(async move { send(&app, "DELETE", Some(&id), None).await.status() })
        };
        [first, second]
    });

    let mut successes = 0;
    for status in join_all(deletes).await {
        let status = status.unwrap();
        assert!(status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND);
        if status == StatusCode::NO_CONTENT {
            successes += 1;
        }
    }

    assert!(successes >= ids.len());
    assert!(state.registry.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn delete_racing_disconnect_leaves_nothing_behind() {
    let (state, app) = create_app();
    let ids = join_all((0..40).map(|_| open_session(&app))).await;

    let mut streams = Vec::new();
    for id in &ids {
        let response = send(&app, "GET", Some(id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        streams.push(response);
    }

    let deleter = {
        let app = app.clone();
        let ids = ids.clone();
        tokio::spawn(async move {
            for id in ids.iter().step_by(2) {
                let status = send(&app, "DELETE", Some(id), None).await.status();
                assert!(status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND);
            }
        })
    };
    // Client side hangs up on every stream while deletes are in flight.
    drop(streams);
    deleter.await.unwrap();

    wait_for_empty(&state).await;
    for id in &ids {
        assert_eq!(ping(&app, id).await, StatusCode::NOT_FOUND);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rapid_open_close_cycles() {
    let (state, app) = create_app();

    for _ in 0..50 {
        let id = open_session(&app).await;
        assert_eq!(ping(&app, &id).await, StatusCode::OK);
        assert_eq!(
            send(&app, "DELETE", Some(&id), None).await.status(),
            StatusCode::NO_CONTENT
        );
    }

    assert!(state.registry.is_empty().await);
}

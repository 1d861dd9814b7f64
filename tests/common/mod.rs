#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use docket_auth::app::{AppState, build_router};
use docket_auth::auth::token::TokenKeys;
use docket_auth::store::memory::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef01";

pub fn test_state() -> AppState {
    test_state_with_dev_mode(true)
}

pub fn test_state_with_dev_mode(dev_mode: bool) -> AppState {
    AppState {
        store: Arc::new(InMemoryStore::new()),
        token_keys: TokenKeys::from_secret(TEST_SECRET).expect("keys"),
        session_ttl: Duration::from_secs(86_400),
        reset_ttl: Duration::from_secs(3_600),
        dev_mode,
    }
}

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    app.oneshot(request).await.expect("response")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Sign up an account and return the response body (`token` + `user`).
pub async fn signup(app: Router, email: &str, password: &str) -> serde_json::Value {
    let response = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(serde_json::json!({
            "email": email,
            "password": password,
            "firstname": "Ann",
            "lastname": "Lee",
        })),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    read_json(response).await
}

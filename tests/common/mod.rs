// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

use axum::body::Body;
use axum::http::{header, Request, Response};
use souls::config::Config;
use souls::db::FirestoreDb;
use souls::middleware::auth::{create_jwt, AuthUser};
use souls::models::{NewActivity, Role};
use souls::routes::create_router;
use souls::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::test_default(), test_db_offline()));
    (create_router(state.clone()), state)
}

/// Create an app backed by the emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::test_default(), test_db().await));
    (create_router(state.clone()), state)
}

/// Create an emulator-backed app that posts notifications to `webhook_url`.
#[allow(dead_code)]
pub async fn create_emulator_app_with_webhook(webhook_url: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config {
        notification_webhook_url: Some(webhook_url.to_string()),
        ..Config::test_default()
    };
    let state = Arc::new(AppState::new(config, test_db().await));
    (create_router(state.clone()), state)
}

/// Webhook URL on a port nothing listens on.
#[allow(dead_code)]
pub fn unreachable_webhook() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let addr = listener.local_addr().expect("local addr");
    format!("http://{}/hook", addr)
}

#[allow(dead_code)]
pub fn student(id: &str) -> AuthUser {
    AuthUser {
        user_id: id.to_string(),
        role: Role::Student,
        name: Some(format!("Student {}", id)),
        email: Some(format!("{}@uni.test", id)),
    }
}

#[allow(dead_code)]
pub fn admin(id: &str) -> AuthUser {
    AuthUser {
        role: Role::Admin,
        ..student(id)
    }
}

/// Session token signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(user: &AuthUser, signing_key: &[u8]) -> String {
    create_jwt(user, signing_key).expect("Failed to create JWT")
}

/// Unique suffix for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Minimal valid create-activity body.
#[allow(dead_code)]
pub fn activity_request(title: &str, start: &str, end: Option<&str>) -> NewActivity {
    let mut body = serde_json::json!({
        "title": title,
        "description": "Actividad de prueba",
        "category": "community",
        "modality": "in_person",
        "start": start,
        "capacity": 10,
        "location": {"venue": "Sede", "address": "Av. Siempre Viva 742", "district": "Santiago"}
    });
    if let Some(end) = end {
        body["end"] = serde_json::json!(end);
    }
    serde_json::from_value(body).expect("valid activity body")
}

/// Send a request as `user`, with an optional JSON body.
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<(&AuthUser, &[u8])>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user, key)) = user {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user, key)),
        );
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

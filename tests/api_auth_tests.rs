// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! API authentication and authorization tests.
//!
//! These run offline against the mock database: everything checked here is
//! decided before a handler touches Firestore.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{admin, create_test_app, json_body, send, student};
use tower::ServiceExt;

#[tokio::test]
async fn test_health_no_auth_required() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/api/activities", None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/activities")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = create_test_app();
    let user = student("s1");

    let response = send(
        &app,
        "GET",
        "/api/me",
        Some((&user, &b"some_other_key_that_is_32_bytes!"[..])),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_echoes_identity() {
    let (app, state) = create_test_app();
    let user = student("s1");

    let response = send(
        &app,
        "GET",
        "/api/me",
        Some((&user, state.config.jwt_signing_key.as_slice())),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user_id"], "s1");
    assert_eq!(body["role"], "student");
    assert_eq!(body["email"], "s1@uni.test");
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let (app, state) = create_test_app();
    let token = common::create_test_jwt(&admin("a1"), &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .header(header::COOKIE, format!("souls_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_student_denied_admin_routes() {
    let (app, state) = create_test_app();
    let user = student("s1");
    let key = state.config.jwt_signing_key.clone();

    let cases = [
        ("POST", "/api/admin/activities"),
        ("PUT", "/api/admin/activities/a1"),
        ("DELETE", "/api/admin/activities/a1"),
        ("POST", "/api/admin/activities/a1/close"),
        ("POST", "/api/admin/activities/a1/roster"),
        ("PUT", "/api/admin/rosters/roster_a1/attendance"),
        ("POST", "/api/admin/activities/a1/report"),
        ("GET", "/api/admin/dashboard"),
        ("GET", "/api/admin/export/enrollments"),
    ];

    for (method, uri) in cases {
        let response = send(&app, method, uri, Some((&user, key.as_slice())), None).await;
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "{} {} should be admin-only",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn test_admin_route_without_token_is_unauthorized() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/api/admin/dashboard", None, None).await;

    // Authentication runs before the role check
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/activities")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/auth/logout", None, None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("logout should set a removal cookie")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("souls_token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _) = create_test_app();

    let response = send(&app, "GET", "/health", None, None).await;

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests.
//!
//! These tests verify that:
//! 1. Only admins can exchange an ID token for a session
//! 2. Protected routes need a session for the currently signed-in admin
//! 3. Reads come from the view and writes reach the store
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;
use vaid_dashboard::middleware::auth::{create_jwt, SESSION_COOKIE};
use vaid_dashboard::services::identity::{NOT_AN_ADMIN, USER_NOT_FOUND};

mod common;
use common::{
    admin, all_ready, client_doc, create_test_app, phone_id_token, user, wait_for_view, TestApp,
};

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Sign in as admin `a1` and wait for the view to load. Returns the session token.
async fn sign_in(app: &TestApp) -> String {
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/auth/session",
            None,
            json!({ "id_token": phone_id_token("uid-a1", "+15550000001") }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    wait_for_view(&app.state.view, all_ready).await;
    body["token"].as_str().unwrap().to_string()
}

fn seeded_app() -> TestApp {
    let app = create_test_app();
    app.store.seed_users(vec![
        admin("a1", "+15550000001"),
        user("c1", "Harbour Co", "+15550000010", &["client"]),
        user("e1", "Ravi", "+15550000020", &["employee"]),
    ]);
    app.store.seed_clients(vec![client_doc("s1", "c1")]);
    app
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let app = create_test_app();
    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["signed_in"], false);
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();
    let (status, _) = send(
        &app.router,
        Request::builder()
            .uri("/api/view")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = create_test_app();
    let (status, _) = send(&app.router, get("/api/view", "invalid.token.here")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_sets_cookie_and_loads_view() {
    let app = seeded_app();

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/auth/session",
            None,
            json!({ "id_token": phone_id_token("uid-a1", "+15550000001") }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
    assert!(cookie.contains("HttpOnly"));

    wait_for_view(&app.state.view, all_ready).await;

    // The cookie alone is enough.
    let session = cookie.split(';').next().unwrap().to_string();
    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/api/me")
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "a1");
    assert_eq!(body["phone"], "+15550000001");
}

#[tokio::test]
async fn test_unknown_user_is_rejected() {
    let app = seeded_app();
    let (status, body) = send(
        &app.router,
        post_json(
            "/auth/session",
            None,
            json!({ "id_token": phone_id_token("uid-x", "+19990000000") }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"], USER_NOT_FOUND);
    assert!(app.state.identity.borrow().is_none());
    assert_eq!(app.store.calls.total_reads(), 0);
}

#[tokio::test]
async fn test_non_admin_is_rejected() {
    let app = seeded_app();
    let (status, body) = send(
        &app.router,
        post_json(
            "/auth/session",
            None,
            json!({ "id_token": phone_id_token("uid-e1", "+15550000020") }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"], NOT_AN_ADMIN);
    assert!(app.state.identity.borrow().is_none());
}

#[tokio::test]
async fn test_forged_id_token_is_unauthorized() {
    let app = seeded_app();
    let (status, _) = send(
        &app.router,
        post_json("/auth/session", None, json!({ "id_token": "not-a-jwt" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_other_identity_is_rejected() {
    let app = seeded_app();
    sign_in(&app).await;

    // Well-signed, but not for the admin who is currently signed in.
    let stale = create_jwt("a1", "uid-old", &app.state.config.jwt_signing_key).unwrap();
    let (status, _) = send(&app.router, get("/api/view", &stale)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_view_and_detail_routes() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, view) = send(&app.router, get("/api/view", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["signed_in"], "a1");
    assert_eq!(view["users"].as_array().unwrap().len(), 3);
    assert_eq!(view["status"]["users"]["state"], "ready");

    let (status, clients) = send(&app.router, get("/api/clients", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clients.as_array().unwrap().len(), 1);

    let (status, client) = send(&app.router, get("/api/clients/c1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(client["clients"][0]["site_name"], "Site s1");

    let (status, employee) = send(&app.router, get("/api/employees/e1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(employee["name"], "Ravi");
    assert!(employee["attendance"].as_array().unwrap().is_empty());

    let (status, _) = send(&app.router, get("/api/clients/e1", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_route() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, _) = send(&app.router, post_json("/api/refresh/inbox", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) =
        send(&app.router, post_json("/api/refresh/patrols", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_create_employee_validation_error() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, body) = send(
        &app.router,
        post_json(
            "/api/employees",
            Some(&token),
            json!({ "name": "Asha", "email": "asha@example.com", "phone": "", "address": "" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"], "Please fill in all fields: address, phone");
}

#[tokio::test]
async fn test_inbox_post_and_search() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, created) = send(
        &app.router,
        post_json(
            "/api/inbox",
            Some(&token),
            json!({
                "title": "Fence repair at north gate",
                "images": [{
                    "file_name": "fence.jpg",
                    "content_type": "image/jpeg",
                    "data": STANDARD.encode([1u8, 2, 3]),
                }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    assert_eq!(
        app.objects.get("images/fence.jpg"),
        Some(("image/jpeg".to_string(), vec![1, 2, 3]))
    );

    let (status, hits) = send(&app.router, get("/api/inbox?q=FENCE", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (_, misses) = send(&app.router, get("/api/inbox?q=payroll", &token)).await;
    assert!(misses.as_array().unwrap().is_empty());

    let (status, message) = send(&app.router, get(&format!("/api/inbox/{}", id), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message["image_urls"][0], "memory://images/fence.jpg");
}

#[tokio::test]
async fn test_inbox_post_rejects_bad_base64() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, _) = send(
        &app.router,
        post_json(
            "/api/inbox",
            Some(&token),
            json!({ "title": "Notice", "images": [{ "file_name": "a.jpg", "data": "***" }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.inbox().is_empty());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = seeded_app();
    let token = sign_in(&app).await;

    let (status, _) = send(&app.router, post_json("/auth/logout", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.state.identity.borrow().is_none());

    let (status, _) = send(&app.router, get("/api/view", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-content-type-options"));
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/view")
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

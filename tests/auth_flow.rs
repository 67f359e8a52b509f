use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use userhub::{
    build_app,
    config::{AppConfig, JwtConfig, RateQuota},
    store::MemoryUserStore,
    AppState,
};

fn test_app() -> Router {
    build_app(AppState::fake())
}

/// App whose credential endpoints allow only `limit` requests per minute.
fn throttled_app(limit: u32) -> Router {
    let config = Arc::new(AppConfig {
        database_url: None,
        max_connections: 2,
        acquire_timeout_secs: 1,
        jwt: JwtConfig {
            secret: "test-secret-test-secret-test-secret!".into(),
            algorithm: "HS256".into(),
            ttl_minutes: 5,
        },
        rate_limit: RateQuota {
            limit,
            window: time::Duration::minutes(1),
        },
    });
    let state = AppState::from_parts(Arc::new(MemoryUserStore::new()), config)
        .expect("test state should build");
    build_app(state)
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn post_register(app: &Router, payload: Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_login(app: &Router, username: &str, password: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "username={}&password={}",
            username, password
        )))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn get_me(app: &Router, auth_header: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri("/me");
    if let Some(value) = auth_header {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn register_creates_an_account() {
    let app = test_app();

    let response = post_register(
        &app,
        json!({
            "email": "ada@example.com",
            "password": "hunter2hunter2",
            "full_name": "Ada Lovelace"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["full_name"], "Ada Lovelace");
    assert!(body["id"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn register_validates_email_and_password() {
    let app = test_app();

    let response = post_register(
        &app,
        json!({ "email": "not-an-email", "password": "hunter2hunter2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_register(
        &app,
        json!({ "email": "ada@example.com", "password": "short" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_register(
        &app,
        json!({ "email": "ada@example.com", "password": "x".repeat(73) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 8 and 72 characters are both acceptable
    let response = post_register(
        &app,
        json!({ "email": "min@example.com", "password": "12345678" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_register(
        &app,
        json!({ "email": "max@example.com", "password": "x".repeat(72) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = test_app();

    let payload = json!({ "email": "ada@example.com", "password": "hunter2hunter2" });
    assert_eq!(
        post_register(&app, payload.clone()).await.status(),
        StatusCode::CREATED
    );

    let response = post_register(&app, payload).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn emails_differing_in_case_register_separately() {
    let app = test_app();

    let response = post_register(
        &app,
        json!({ "email": "ada@example.com", "password": "hunter2hunter2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_register(
        &app,
        json!({ "email": "Ada@example.com", "password": "hunter2hunter2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn login_returns_a_bearer_token() {
    let app = test_app();
    post_register(
        &app,
        json!({ "email": "ada@example.com", "password": "hunter2hunter2" }),
    )
    .await;

    let response = post_login(&app, "ada@example.com", "hunter2hunter2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let app = test_app();
    post_register(
        &app,
        json!({ "email": "ada@example.com", "password": "hunter2hunter2" }),
    )
    .await;

    let wrong_password = post_login(&app, "ada@example.com", "wrong-password").await;
    let unknown_email = post_login(&app, "nobody@example.com", "hunter2hunter2").await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_email).await
    );
}

#[tokio::test]
async fn me_returns_the_token_owner() {
    let app = test_app();
    let response = post_register(
        &app,
        json!({
            "email": "test@example.com",
            "password": "secret123",
            "full_name": "Test User"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["email"], "test@example.com");

    let login = post_login(&app, "test@example.com", "secret123").await;
    assert_eq!(login.status(), StatusCode::OK);
    let token = body_json(login).await["access_token"]
        .as_str()
        .expect("token")
        .to_string();

    let response = get_me(&app, Some(&format!("Bearer {}", token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["email"], "test@example.com");
    assert_eq!(body["full_name"], "Test User");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn me_rejects_missing_or_bad_tokens() {
    let app = test_app();

    let response = get_me(&app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_me(&app, Some("Bearer invalid_token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_me(&app, Some("Basic YWRhOmh1bnRlcjI=")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn credential_endpoints_are_throttled() {
    let app = throttled_app(2);
    let payload = json!({ "email": "ada@example.com", "password": "hunter2hunter2" });

    assert_eq!(
        post_register(&app, payload.clone()).await.status(),
        StatusCode::CREATED
    );
    assert_eq!(
        post_register(&app, payload.clone()).await.status(),
        StatusCode::CONFLICT
    );

    let response = post_register(&app, payload.clone()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different forwarded client gets its own window
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "9.9.9.9")
        .body(Body::from(
            json!({ "email": "bob@example.com", "password": "hunter2hunter2" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

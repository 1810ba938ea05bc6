//! HTTP层端到端测试
//!
//! 使用内存存储和固定映射的身份交换驱动完整路由

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_service::infrastructure::{ExchangeError, IdentityExchange, MemoryStore, WeChatSession};
use auth_service::{create_routes, AppState, Config};

const SECRET: &str = "integration-test-secret-key-0123456789";

struct StubExchange;

#[async_trait]
impl IdentityExchange for StubExchange {
    async fn code_to_session(&self, code: &str) -> Result<WeChatSession, ExchangeError> {
        match code {
            "code-1" | "code-2" => Ok(WeChatSession {
                open_id: "openid-1".to_string(),
                session_key: "session-key".to_string(),
                union_id: None,
            }),
            _ => Err(ExchangeError::Api {
                code: 40029,
                message: "invalid code".to_string(),
            }),
        }
    }
}

fn config(proxy_url: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET_KEY", SECRET.to_string()),
        ("BCRYPT_COST", "4".to_string()),
        ("PROXY_URL", proxy_url.to_string()),
    ]);
    Config::from_lookup(|key: &str| vars.get(key).cloned()).unwrap()
}

fn app_with_proxy(proxy_url: &str) -> Router {
    let state = AppState::build(
        &config(proxy_url),
        Arc::new(MemoryStore::new()),
        Arc::new(StubExchange),
    )
    .unwrap();
    create_routes(state)
}

fn app() -> Router {
    app_with_proxy("")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get_with_token(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn register_and_login(app: &Router, username: &str) -> Value {
    let (status, _) = post_json(
        app,
        "/register",
        json!({ "username": username, "password": "secret1", "email": "a@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(
        app,
        "/login",
        json!({ "username": username, "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_with_token(&app(), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let app = app();

    let (status, body) = post_json(
        &app,
        "/register",
        json!({ "username": "alice", "password": "secret1", "email": "a@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], "alice");

    let (status, tokens) = post_json(
        &app,
        "/login",
        json!({ "username": "alice", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["expires_in"], 900);
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
    assert!(tokens["access_token"].is_string());

    let (status, grant) = post_json(&app, "/refresh", json!({ "refresh_token": refresh_token })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(grant["access_token"].is_string());
    assert!(grant.get("refresh_token").is_none());

    // refresh token不轮换，仍然可用
    let (status, _) = post_json(&app, "/refresh", json!({ "refresh_token": refresh_token })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/logout", json!({ "refresh_token": refresh_token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "logged out successfully");

    let (status, body) = post_json(&app, "/refresh", json!({ "refresh_token": refresh_token })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "invalid refresh token");
}

#[tokio::test]
async fn test_access_token_rejected_by_refresh() {
    let app = app();
    let tokens = register_and_login(&app, "alice").await;

    let (status, _) = post_json(
        &app,
        "/refresh",
        json!({ "refresh_token": tokens["access_token"] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_as_bearer() {
    let app = app();
    let tokens = register_and_login(&app, "alice").await;

    let (status, _) = get_with_token(&app, "/me", tokens["refresh_token"].as_str()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_valid_bearer() {
    let app = app();
    let tokens = register_and_login(&app, "alice").await;

    let (missing_status, missing_body) = get_with_token(&app, "/me", None).await;
    let (garbage_status, garbage_body) = get_with_token(&app, "/me", Some("not.a.token")).await;
    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_body["error"]["message"], garbage_body["error"]["message"]);

    let request = Request::builder()
        .uri("/me")
        .header(header::AUTHORIZATION, format!("Token {}", tokens["access_token"].as_str().unwrap()))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get_with_token(&app, "/me", tokens["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_protected_endpoint_reports_principal() {
    let app = app();
    let tokens = register_and_login(&app, "alice").await;

    let (status, body) = get_with_token(&app, "/api/protected", tokens["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "alice");
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let app = app();
    register_and_login(&app, "alice").await;

    let (status, _) = post_json(
        &app,
        "/register",
        json!({ "username": "alice", "password": "another", "email": "b@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for body in [
        json!({ "username": "al", "password": "secret1", "email": "a@x.com" }),
        json!({ "username": "bob", "password": "short", "email": "a@x.com" }),
        json!({ "username": "bob", "password": "secret1", "email": "not-an-email" }),
    ] {
        let (status, _) = post_json(&app, "/register", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = post_json(&app, "/login", json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/login", json!({ "username": "", "password": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/logout", json!({ "refresh_token": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app();
    register_and_login(&app, "alice").await;

    let wrong_password = post_json(
        &app,
        "/login",
        json!({ "username": "alice", "password": "wrong-password" }),
    )
    .await;
    let unknown_user = post_json(
        &app,
        "/login",
        json!({ "username": "nobody", "password": "secret1" }),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.1["error"]["code"], unknown_user.1["error"]["code"]);
    assert_eq!(wrong_password.1["error"]["message"], unknown_user.1["error"]["message"]);
}

#[tokio::test]
async fn test_wechat_login() {
    let app = app();

    let (status, first) = post_json(&app, "/wechat/login", json!({ "code": "code-1" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app, "/wechat/login", json!({ "code": "code-2" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_with_token(&app, "/me", first["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "wx_openid-1");
    assert_eq!(body["open_id"], "openid-1");

    let (status, body) = post_json(&app, "/wechat/login", json!({ "code": "bad-code" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("failed to exchange code"));

    let (status, _) = post_json(&app, "/wechat/login", json!({ "code": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// 启动一个回显查询串的上游服务
async fn spawn_upstream() -> String {
    let upstream = Router::new().route(
        "/v1/daily_house",
        get(|axum::extract::RawQuery(query): axum::extract::RawQuery| async move {
            Json(json!({ "source": "upstream", "query": query }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_proxy_routes_forward_authenticated_requests() {
    let upstream = spawn_upstream().await;
    let app = app_with_proxy(&upstream);
    let tokens = register_and_login(&app, "alice").await;

    let (status, _) = get_with_token(&app, "/v1/daily_house?date=2024-01-01", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get_with_token(
        &app,
        "/v1/daily_house?date=2024-01-01",
        tokens["access_token"].as_str(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "upstream");
    assert_eq!(body["query"], "date=2024-01-01");
}

#[tokio::test]
async fn test_proxy_unreachable_upstream_is_bad_gateway() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = app_with_proxy(&format!("http://{}", addr));
    let tokens = register_and_login(&app, "alice").await;

    let (status, _) = get_with_token(&app, "/v3/fortune/daily", tokens["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_proxy_routes_absent_without_upstream() {
    let app = app();
    let tokens = register_and_login(&app, "alice").await;

    let (status, _) = get_with_token(&app, "/v1/daily_house", tokens["access_token"].as_str()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_unbounded_refresh_ttl_fails_at_startup() {
    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET_KEY", SECRET.to_string()),
        ("REFRESH_TOKEN_TTL_SECONDS", u64::MAX.to_string()),
    ]);
    assert!(Config::from_lookup(|key: &str| vars.get(key).cloned()).is_err());
}

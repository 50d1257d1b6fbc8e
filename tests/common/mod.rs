#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    Extension,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use std::net::SocketAddr;
use tokengate::{ServerConfig, create_app, db::Database, jwt::TokenManager};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret";

pub const ACCESS_TTL: i64 = 15 * 60;
pub const REFRESH_TTL: i64 = 168 * 60 * 60;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// Token manager sharing the app's secret and lifetimes
    pub tokens: TokenManager,
}

pub async fn setup() -> TestApp {
    setup_with_ttls(ACCESS_TTL, REFRESH_TTL).await
}

pub async fn setup_with_ttls(access_ttl: i64, refresh_ttl: i64) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        access_ttl,
        refresh_ttl,
        trust_forwarded_for: false,
    };
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    let app = create_app(&config)
        .expect("Failed to create app")
        .layer(Extension(ConnectInfo(peer)));
    let tokens =
        TokenManager::new(TEST_SECRET, access_ttl, refresh_ttl).expect("Failed to create tokens");

    TestApp { app, db, tokens }
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "username": username, "password": password });
    json_request("POST", "/auth/login", &body.to_string())
}

pub fn refresh_request(refresh_token: &str) -> Request<Body> {
    let body = serde_json::json!({ "refresh_token": refresh_token });
    json_request("POST", "/auth/refresh", &body.to_string())
}

pub fn me_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/auth/me");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn me_bearer(token: &str) -> Request<Body> {
    let value = format!("Bearer {}", token);
    me_request(Some(value.as_str()))
}

/// Send a request and return the status with the JSON body (Null if not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Log in and return (access_token, refresh_token).
pub async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, json) = send(app, login_request(username, password)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", json);
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}

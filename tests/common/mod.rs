#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use rookery::auth::{Authority, AuthorityRpc};
use rookery::jwt::TokenConfig;
use rookery::rpc::RpcServer;
use rookery::store::Store;
use rookery::{AuthConfig, ReservationsConfig, create_auth_app, create_reservations_app};

pub const TEST_SECRET: &[u8] = b"test-signing-secret-0123456789abcdef";

pub async fn test_store() -> Store {
    Store::open(":memory:")
        .await
        .expect("Failed to open test store")
}

/// Build an authority over a fresh in-memory store.
pub async fn test_authority() -> Authority {
    let store = test_store().await;
    Authority::new(store.users(), Arc::new(TokenConfig::new(TEST_SECRET, 3600)))
}

/// Auth service HTTP app over the given authority.
pub fn auth_app(authority: Authority) -> axum::Router {
    create_auth_app(authority, false)
}

/// Start the full auth service (HTTP + RPC) on OS-chosen ports, returning
/// the bound addresses.
pub async fn start_auth_service_on_any_port() -> (SocketAddr, SocketAddr) {
    let config = AuthConfig {
        store: test_store().await,
        signing_secret: TEST_SECRET.to_vec(),
        token_lifetime_secs: 3600,
        secure_cookies: false,
    };
    let (_handle, http_addr, rpc_addr) = rookery::start_auth_service(config, 0, 0).await;
    (http_addr, rpc_addr)
}

/// Start only the RPC side of an authority, returning its address.
pub async fn start_authority_rpc(authority: Authority) -> SocketAddr {
    let server = RpcServer::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind RPC listener");
    let addr = server.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        server.run(AuthorityRpc::new(authority)).await.ok();
    });
    addr
}

/// Reservations app over a fresh store, delegating auth to the given RPC
/// address.
pub async fn reservations_app(authority_addr: SocketAddr) -> axum::Router {
    let config = ReservationsConfig {
        store: test_store().await,
        authority_addr: authority_addr.to_string(),
        authority_timeout_secs: 2,
    };
    create_reservations_app(&config)
}

/// An address with nothing listening on it.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");
    drop(listener);
    addr
}

/// Reservations app whose authority can never be reached.
pub async fn reservations_app_with_dead_authority() -> axum::Router {
    let addr = dead_addr().await;
    let config = ReservationsConfig {
        store: test_store().await,
        authority_addr: addr.to_string(),
        authority_timeout_secs: 1,
    };
    create_reservations_app(&config)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Register a user and log in through the auth app, returning the identity
/// and the raw token from the Set-Cookie header.
pub async fn register_and_login(
    app: &axum::Router,
    email: &str,
    password: &str,
) -> (serde_json::Value, String) {
    use tower::ServiceExt;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/users",
            serde_json::json!({"email": email, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let identity = body_json(response).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({"email": email, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("Login did not set a cookie")
        .to_str()
        .unwrap()
        .to_string();
    let token = cookie
        .strip_prefix("Authentication=")
        .expect("Unexpected cookie name")
        .split(';')
        .next()
        .unwrap()
        .to_string();

    (identity, token)
}

/// Give background listeners a beat to accept.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub mod api;
pub mod auth;
pub mod cli;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod rpc;
pub mod store;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use auth::{AuthClient, Authority, AuthorityRpc};
use jwt::TokenConfig;
use rpc::RpcServer;
use store::Store;

/// Configuration of the auth service, built once at startup.
pub struct AuthConfig {
    /// Store holding the user collection (cloneable, pooled internally)
    pub store: Store,
    /// Secret for signing tokens
    pub signing_secret: Vec<u8>,
    /// Token lifetime in seconds
    pub token_lifetime_secs: u64,
    /// Whether to set Secure on the Authentication cookie (HTTPS deployments)
    pub secure_cookies: bool,
}

/// Configuration of the reservations service, built once at startup.
pub struct ReservationsConfig {
    /// Store holding the reservation collection
    pub store: Store,
    /// Address of the auth service's RPC endpoint
    pub authority_addr: String,
    /// Finite bound on each authority call
    pub authority_timeout_secs: u64,
}

/// Build the authority from config.
pub fn build_authority(config: &AuthConfig) -> Authority {
    let tokens = Arc::new(TokenConfig::new(
        &config.signing_secret,
        config.token_lifetime_secs,
    ));
    Authority::new(config.store.users(), tokens)
}

/// Create the auth service's HTTP application.
pub fn create_auth_app(authority: Authority, secure_cookies: bool) -> Router {
    api::create_auth_router(authority, secure_cookies)
}

/// Create the reservations service's HTTP application.
pub fn create_reservations_app(config: &ReservationsConfig) -> Router {
    let auth = AuthClient::new(
        config.authority_addr.clone(),
        Duration::from_secs(config.authority_timeout_secs),
    );
    api::create_reservations_router(config.store.clone(), auth)
}

/// Run the auth service: the HTTP API and the RPC endpoint, concurrently.
/// This function blocks until either listener fails.
pub async fn run_auth_service(
    config: AuthConfig,
    http_listener: TcpListener,
    rpc_listener: TcpListener,
) -> Result<(), std::io::Error> {
    let authority = build_authority(&config);
    let app = create_auth_app(authority.clone(), config.secure_cookies);
    let rpc_server = RpcServer::from_listener(rpc_listener);

    tokio::select! {
        result = axum::serve(http_listener, app).into_future() => result,
        result = rpc_server.run(AuthorityRpc::new(authority)) => result,
    }
}

/// Run the reservations service. This function blocks until the server exits.
pub async fn run_reservations_service(
    config: ReservationsConfig,
    listener: TcpListener,
) -> Result<(), std::io::Error> {
    let app = create_reservations_app(&config);
    axum::serve(listener, app).await
}

/// Start the auth service in a background task, binding both listeners on
/// 127.0.0.1. Use port 0 to let the OS choose. Returns the HTTP and RPC
/// addresses actually bound.
/// Note: For production use, prefer `run_auth_service` directly in main.
pub async fn start_auth_service(
    config: AuthConfig,
    http_port: u16,
    rpc_port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr, SocketAddr) {
    let http_listener = TcpListener::bind(format!("127.0.0.1:{}", http_port))
        .await
        .expect("Failed to bind");
    let rpc_listener = TcpListener::bind(format!("127.0.0.1:{}", rpc_port))
        .await
        .expect("Failed to bind");

    let http_addr = http_listener.local_addr().expect("Failed to get local address");
    let rpc_addr = rpc_listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_auth_service(config, http_listener, rpc_listener).await.ok();
    });

    (handle, http_addr, rpc_addr)
}

mod error;
mod login;
mod reservations;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::{AuthClient, Authority};
use crate::rate_limit::RateLimitConfig;
use crate::store::Store;

pub use error::{ApiError, validate_id};
pub use reservations::ReservationsState;

/// Shared state of the auth service's HTTP surface.
#[derive(Clone)]
pub struct AuthApiState {
    pub authority: Authority,
    pub rate_limit: Arc<RateLimitConfig>,
    pub secure_cookies: bool,
}

/// Create the auth service router.
pub fn create_auth_router(authority: Authority, secure_cookies: bool) -> Router {
    let state = AuthApiState {
        authority,
        rate_limit: Arc::new(RateLimitConfig::new()),
        secure_cookies,
    };

    Router::new()
        .nest("/users", users::router(state.clone()))
        .nest("/auth", login::router(state))
}

/// Create the reservations service router.
pub fn create_reservations_router(store: Store, auth: AuthClient) -> Router {
    let state = ReservationsState {
        reservations: store.reservations(),
        auth,
    };

    Router::new().nest("/reservations", reservations::router(state))
}

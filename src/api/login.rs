use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header, header::HeaderValue},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use super::AuthApiState;
use super::error::ApiError;
use super::users::normalize_email;
use crate::auth::CREDENTIAL_NAME;

pub fn router(state: AuthApiState) -> Router {
    Router::new().route("/login", post(login)).with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Validate credentials and issue a token. Token issuance is the only
/// operation that sets a client-visible credential; re-validation never
/// does.
async fn login(
    State(state): State<AuthApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email)?;

    if state.rate_limit.login.check_key(&email).is_err() {
        return Err(ApiError::too_many_requests(
            "Too many login attempts. Please try again later.",
        ));
    }

    let identity = state
        .authority
        .validate_credentials(&email, &payload.password)
        .await?;

    let issued = state.authority.issue_token(&identity)?;

    let secure = if state.secure_cookies { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        CREDENTIAL_NAME, issued.token, issued.duration, secure
    );

    let mut response = (StatusCode::OK, Json(identity)).into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

//! Request guard that delegates authentication to the remote authority.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

use super::authority::Identity;
use super::client::{AuthClient, AuthDelegateError};
use super::cookie::get_cookie;

/// Name shared by the credential cookie, request field, and header.
/// External clients may supply the credential through any of the three.
pub const CREDENTIAL_NAME: &str = "Authentication";

/// A bearer credential supplied as a field on the request itself (a request
/// extension), e.g. injected by an upstream layer that already peeled it off
/// another transport.
#[derive(Debug, Clone)]
pub struct Credential(pub String);

/// Extract the bearer credential from a request.
///
/// Precedence is fixed and load-bearing for external clients:
/// the `Authentication` cookie, then a [`Credential`] request field, then
/// the `Authentication` header. First non-empty match wins.
pub fn extract_credential(parts: &Parts) -> Option<String> {
    if let Some(token) = get_cookie(&parts.headers, CREDENTIAL_NAME) {
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    if let Some(Credential(token)) = parts.extensions.get::<Credential>() {
        if !token.is_empty() {
            return Some(token.clone());
        }
    }

    if let Some(value) = parts.headers.get(CREDENTIAL_NAME) {
        if let Ok(token) = value.to_str() {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    None
}

/// State that can hand the guard its authority client.
pub trait HasAuthDelegate {
    fn auth_client(&self) -> &AuthClient;
}

/// Extractor gating protected operations.
///
/// Without a credential the request is rejected outright, with no authority
/// call. With one, the guard makes exactly one delegation call and maps any
/// failure, including an unreachable authority, to the same rejection. No
/// retries.
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: HasAuthDelegate + Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_credential(parts) else {
            return Err(GuardRejection);
        };

        match state.auth_client().authenticate(&token).await {
            Ok(identity) => Ok(Authenticated(identity)),
            Err(AuthDelegateError::Unauthorized) => Err(GuardRejection),
            Err(AuthDelegateError::Unavailable(reason)) => {
                warn!(error = %reason, "Authority unreachable, rejecting request");
                Err(GuardRejection)
            }
        }
    }
}

/// Uniform rejection: the client learns only that it was not admitted.
#[derive(Debug)]
pub struct GuardRejection;

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Unauthorized",
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_of(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_no_credential_anywhere() {
        let parts = parts_of(Request::builder().body(()).unwrap());
        assert_eq!(extract_credential(&parts), None);
    }

    #[test]
    fn test_cookie_credential() {
        let parts = parts_of(
            Request::builder()
                .header("cookie", "Authentication=tok-cookie")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-cookie"));
    }

    #[test]
    fn test_field_credential() {
        let parts = parts_of(
            Request::builder()
                .extension(Credential("tok-field".to_string()))
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-field"));
    }

    #[test]
    fn test_header_credential() {
        let parts = parts_of(
            Request::builder()
                .header("Authentication", "tok-header")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-header"));
    }

    #[test]
    fn test_cookie_beats_field_and_header() {
        let parts = parts_of(
            Request::builder()
                .header("cookie", "Authentication=tok-cookie")
                .header("Authentication", "tok-header")
                .extension(Credential("tok-field".to_string()))
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-cookie"));
    }

    #[test]
    fn test_field_beats_header() {
        let parts = parts_of(
            Request::builder()
                .header("Authentication", "tok-header")
                .extension(Credential("tok-field".to_string()))
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-field"));
    }

    #[test]
    fn test_empty_values_fall_through() {
        let parts = parts_of(
            Request::builder()
                .header("cookie", "Authentication=")
                .extension(Credential(String::new()))
                .header("Authentication", "tok-header")
                .body(())
                .unwrap(),
        );
        assert_eq!(extract_credential(&parts).as_deref(), Some("tok-header"));
    }
}

//! Authority-side authentication: credential validation, token issuance,
//! and token resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::jwt::{IssuedToken, TokenConfig};
use crate::password::{hash_password, verify_password};
use crate::store::{StoreError, Stored, UserRecord, UserStore};

/// The resolved identity of an authenticated caller.
///
/// Constructed fresh per request, never persisted by consuming services,
/// and never carries secret material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

fn identity_of(user: Stored<UserRecord>) -> Identity {
    Identity {
        id: user.id,
        email: user.fields.email,
    }
}

/// Errors from authority operations.
///
/// `Unauthorized` is deliberately reason-free: unknown email, wrong
/// password, bad signature, and expired token all look the same to callers.
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    /// The identifying field is already registered.
    Conflict,
    Store(StoreError),
    Internal,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::Conflict => write!(f, "Already registered"),
            AuthError::Store(e) => write!(f, "Store error: {}", e),
            AuthError::Internal => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for AuthError {}

/// The authentication authority. Owns the user collection and the signing
/// key material.
#[derive(Clone)]
pub struct Authority {
    users: UserStore,
    tokens: Arc<TokenConfig>,
}

impl Authority {
    pub fn new(users: UserStore, tokens: Arc<TokenConfig>) -> Self {
        Self { users, tokens }
    }

    /// Register a new identity. Fails with `Conflict` when the email is
    /// already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let hash = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::Internal
        })?;

        match self.users.create(email, &hash).await {
            Ok(user) => Ok(identity_of(user)),
            Err(StoreError::Conflict) => Err(AuthError::Conflict),
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// Look up the identity by email and verify the password against the
    /// stored hash. Fails with a uniform `Unauthorized` on any mismatch.
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let user = match self.users.by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::Unauthorized),
            Err(e) => return Err(AuthError::Store(e)),
        };

        if !verify_password(&user.fields.password_hash, password) {
            return Err(AuthError::Unauthorized);
        }

        Ok(identity_of(user))
    }

    /// Issue a signed, time-limited token for an identity.
    pub fn issue_token(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        self.tokens.issue(&identity.id).map_err(|e| {
            error!(error = %e, "Failed to issue token");
            AuthError::Internal
        })
    }

    /// Verify a token's signature and expiry, then resolve the embedded id
    /// to the full identity. Re-validation has no side effects.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.tokens.verify(token).map_err(|_| AuthError::Unauthorized)?;

        match self.users.by_id(&claims.sub).await {
            Ok(user) => Ok(identity_of(user)),
            // The user behind a still-valid token may have been deleted.
            Err(StoreError::NotFound) => Err(AuthError::Unauthorized),
            Err(e) => Err(AuthError::Store(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use jsonwebtoken::{EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const TEST_SECRET: &[u8] = b"test-signing-secret-0123456789abcdef";

    async fn test_authority() -> Authority {
        let store = Store::open(":memory:").await.unwrap();
        Authority::new(store.users(), Arc::new(TokenConfig::new(TEST_SECRET, 3600)))
    }

    #[tokio::test]
    async fn test_register_validate_issue_authenticate_round_trip() {
        let authority = test_authority().await;

        let registered = authority.register("a@x.com", "pw123!").await.unwrap();
        assert_eq!(registered.email, "a@x.com");

        let validated = authority
            .validate_credentials("a@x.com", "pw123!")
            .await
            .unwrap();
        assert_eq!(validated, registered);

        let issued = authority.issue_token(&validated).unwrap();

        let resolved = authority.authenticate(&issued.token).await.unwrap();
        assert_eq!(resolved.id, registered.id);
        assert_eq!(resolved.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_identity_never_serializes_secret_material() {
        let authority = test_authority().await;

        let identity = authority.register("a@x.com", "pw123!").await.unwrap();
        let json = serde_json::to_value(&identity).unwrap();

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("id"));
        assert!(obj.contains_key("email"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_conflict() {
        let authority = test_authority().await;

        authority.register("a@x.com", "pw123!").await.unwrap();
        let result = authority.register("a@x.com", "other-pw").await;
        assert!(matches!(result, Err(AuthError::Conflict)));

        // First registration still works.
        authority
            .validate_credentials("a@x.com", "pw123!")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let authority = test_authority().await;
        authority.register("a@x.com", "pw123!").await.unwrap();

        let wrong_password = authority.validate_credentials("a@x.com", "nope").await;
        let unknown_email = authority.validate_credentials("ghost@x.com", "pw123!").await;

        assert!(matches!(wrong_password, Err(AuthError::Unauthorized)));
        assert!(matches!(unknown_email, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let authority = test_authority().await;
        let identity = authority.register("a@x.com", "pw123!").await.unwrap();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = crate::jwt::TokenClaims {
            sub: identity.id,
            iat: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap();

        let result = authority.authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let authority = test_authority().await;
        let identity = authority.register("a@x.com", "pw123!").await.unwrap();

        let foreign = TokenConfig::new(b"some-other-secret-0123456789abcdef", 3600);
        let token = foreign.issue(&identity.id).unwrap().token;

        let result = authority.authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_is_unauthorized() {
        let store = Store::open(":memory:").await.unwrap();
        let authority = Authority::new(store.users(), Arc::new(TokenConfig::new(TEST_SECRET, 3600)));

        let identity = authority.register("a@x.com", "pw123!").await.unwrap();
        let token = authority.issue_token(&identity).unwrap().token;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&identity.id)
            .execute(store.pool())
            .await
            .unwrap();

        let result = authority.authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }
}

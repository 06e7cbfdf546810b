//! Signed token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims carried by an authentication token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Configuration for token operations: key material plus the configured
/// lifetime. Built once at startup, read-only afterwards.
#[derive(Clone)]
pub struct TokenConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime_secs: u64,
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token lifetime in seconds
    pub duration: u64,
}

impl TokenConfig {
    /// Create a new token configuration with the given secret and lifetime.
    pub fn new(secret: &[u8], lifetime_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime_secs,
        }
    }

    /// Issue a token for a user, expiring `lifetime_secs` from now.
    pub fn issue(&self, user_id: &str) -> Result<IssuedToken, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TimeError)?
            .as_secs();

        let exp = now + self.lifetime_secs;

        let claims = TokenClaims {
            sub: user_id.to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            duration: self.lifetime_secs,
        })
    }

    /// Validate signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::Decoding)?;

        Ok(token_data.claims)
    }
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (bad signature, expired, malformed)
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-testing";

    #[test]
    fn test_issue_and_verify() {
        let config = TokenConfig::new(TEST_SECRET, 3600);

        let issued = config.issue("user-123").unwrap();
        assert_eq!(issued.duration, 3600);

        let claims = config.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.exp, issued.expires_at);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_invalid_token() {
        let config = TokenConfig::new(TEST_SECRET, 3600);

        assert!(config.verify("not-a-token").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config1 = TokenConfig::new(b"secret-1-secret-1-secret-1", 3600);
        let config2 = TokenConfig::new(b"secret-2-secret-2-secret-2", 3600);

        let issued = config1.issue("user-123").unwrap();
        assert!(config2.verify(&issued.token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let encoding_key = EncodingKey::from_secret(TEST_SECRET);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Claims with exp in the past
        let claims = TokenClaims {
            sub: "user-123".to_string(),
            iat: now - 100,
            exp: now - 50,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let config = TokenConfig::new(TEST_SECRET, 3600);
        assert!(config.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = TokenConfig::new(TEST_SECRET, 3600);

        let issued = config.issue("user-123").unwrap();
        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push('A');

        assert!(config.verify(&tampered).is_err());
    }
}

//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket keyed by the identifier under attack, so hammering
//! one account cannot lock out unrelated logins.

use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

/// Keyed limiter for endpoint-specific throttling.
pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login attempts per email per minute.
const LOGIN_PER_MIN: u32 = 10;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-email limiter for login attempts (10 per minute).
    pub login: Arc<KeyedLimiter>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(LOGIN_PER_MIN).unwrap(),
            ))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_per_key() {
        let config = RateLimitConfig::new();

        for _ in 0..LOGIN_PER_MIN {
            assert!(config.login.check_key(&"a@x.com".to_string()).is_ok());
        }
        assert!(config.login.check_key(&"a@x.com".to_string()).is_err());

        // A different key still has a full bucket.
        assert!(config.login.check_key(&"b@x.com".to_string()).is_ok());
    }
}

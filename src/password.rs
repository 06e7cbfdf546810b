//! Password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password into a salted PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError)?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored PHC hash string.
///
/// The comparison inside argon2 is constant-time. An unparseable stored hash
/// counts as a mismatch.
pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// Error hashing a password.
#[derive(Debug)]
pub struct PasswordError(argon2::password_hash::Error);

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to hash password: {}", self.0)
    }
}

impl std::error::Error for PasswordError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("pw123!").unwrap();

        assert_ne!(hash, "pw123!");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "pw123!"));
        assert!(!verify_password(&hash, "pw123?"));
    }

    #[test]
    fn test_salts_are_unique() {
        let hash1 = hash_password("pw123!").unwrap();
        let hash2 = hash_password("pw123!").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_garbage_stored_hash_is_mismatch() {
        assert!(!verify_password("not-a-phc-string", "pw123!"));
        assert!(!verify_password("", "pw123!"));
    }
}

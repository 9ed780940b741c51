use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;
use tracing::{error, instrument};

use crate::errors::ServiceError;

/// Shortest password accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => ServiceError::ValidationError(err.to_string()),
            PasswordError::Hash(msg) => ServiceError::HashError(msg),
        }
    }
}

/// Hashes a plain-text password with a random salt.
#[instrument(skip(password))]
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            PasswordError::Hash(e.to_string())
        })
}

/// Checks `password` against a stored PHC hash string.
#[instrument(skip_all)]
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn short_password_is_rejected() {
        assert_matches!(hash_password("abc"), Err(PasswordError::TooShort));
        assert_matches!(
            ServiceError::from(PasswordError::TooShort),
            ServiceError::ValidationError(_)
        );
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert_matches!(
            verify_password("secret1", "not-a-phc-string"),
            Err(PasswordError::Hash(_))
        );
    }
}

use crate::error::EngineError;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hashes a user password or client secret into an Argon2id PHC string
pub fn hash_secret(secret: &str) -> Result<String, EngineError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EngineError::Hash(e.to_string()))
}

/// Compares `secret` against a stored PHC string
pub fn verify_secret(hash: &str, secret: &str) -> Result<(), EngineError> {
    let parsed = PasswordHash::new(hash).map_err(|e| EngineError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .map_err(|_| EngineError::InvalidCredentials)
}

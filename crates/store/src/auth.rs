//! Password hashing for customer accounts.

use argon2::Config;
use rand::{thread_rng, RngCore};

use crate::error::{Result, StoreError};

/// Hashes a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    thread_rng().fill_bytes(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
        .map_err(|e| StoreError::Credential(e.to_string()))
}

/// Verifies a plaintext password against a stored hash.
///
/// A malformed hash verifies as false rather than erroring, so a
/// corrupted row cannot be used to probe the hashing setup.
pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

//! Password hashing with Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use reportpay_core::{BillingError, Result};

/// Hash a password into a PHC string.
///
/// # Errors
///
/// Returns `BillingError::Storage` if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BillingError::Storage(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash never verifies.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is malformed");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Run [`hash_password`] off the async executor.
///
/// # Errors
///
/// Returns `BillingError::Storage` if hashing fails or the blocking task panics.
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| BillingError::Storage(format!("hashing task failed: {e}")))?
}

/// Run [`verify_password`] off the async executor.
pub async fn verify_password_blocking(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .unwrap_or(false)
}

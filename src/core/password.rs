// Password hashing with bcrypt

use crate::core::errors::CryptoError;

/// bcrypt cost used when none is configured (12)
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts; only for tests
pub const MIN_BCRYPT_COST: u32 = 4;

/// bcrypt only looks at the first 72 bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with a fresh random salt.
///
/// bcrypt is CPU-bound, so it runs on the blocking pool instead of an async
/// worker thread.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, CryptoError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| CryptoError::HashingError(e.to_string()))
    })
    .await
    .map_err(|e| CryptoError::HashingError(format!("Task join error: {}", e)))?
}

/// Check a password against a stored hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash is unusable.
/// bcrypt compares digests in constant time.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).map_err(|e| CryptoError::HashingError(e.to_string()))
    })
    .await
    .map_err(|e| CryptoError::HashingError(format!("Task join error: {}", e)))?
}

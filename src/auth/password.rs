/// Password Hashing and Verification
///
/// bcrypt produces salted, slow hashes and compares in constant time.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - Plain text password to hash
/// * `cost` - bcrypt work factor (4..=31)
///
/// # Errors
/// Returns an internal error if bcrypt fails (invalid cost, RNG failure)
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// Verify a password against its hash
///
/// Returns `Ok(false)` for a wrong password. An `Err` means the stored hash
/// itself is unusable, which is an internal failure, not a credential one.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash).map_err(|e| {
        tracing::error!(error = %e, "Failed to verify password");
        AppError::Internal(format!("Password verification failed: {}", e))
    })
}

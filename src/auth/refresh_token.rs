/// Refresh Token Generation
///
/// Refresh tokens are:
/// - 64 random alphanumeric characters from a CSPRNG (~380 bits)
/// - Opaque: a lookup key into the refresh token store, nothing embedded
/// - Single-use: the rotation flow deletes them on every successful refresh

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

const REFRESH_TOKEN_LENGTH: usize = 64;

/// A refresh token value and the moment it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedRefreshToken {
    pub fn new(expiry_seconds: i64, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: generate_refresh_token(),
            expires_at: issued_at + Duration::seconds(expiry_seconds),
        }
    }
}

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

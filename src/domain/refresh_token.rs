use chrono::{DateTime, Utc};

/// Stored refresh token record
///
/// `token` is the opaque value handed to the client. Stores are free to
/// keep a digest of it instead of the plaintext.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

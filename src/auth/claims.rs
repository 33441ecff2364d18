/// JWT Claims structure
///
/// Typed payload of an access token. The token is decoded straight into this
/// struct, so a missing or mistyped claim fails once, at decode time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Role, User};

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject user id
    pub user_id: i64,
    /// Role snapshot at issuance
    pub role: Role,
    /// `User::token_version` snapshot at issuance
    pub token_version: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for `user`, valid for `expiry_seconds` from `issued_at`
    pub fn new(user: &User, expiry_seconds: i64, issuer: &str, issued_at: DateTime<Utc>) -> Self {
        let now = issued_at.timestamp();
        Self {
            user_id: user.id,
            role: user.role,
            token_version: user.token_version,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer.to_string(),
        }
    }
}

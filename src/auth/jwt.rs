/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed and verified without touching storage.
/// Refresh tokens are opaque random strings backed by the refresh token store.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::auth::refresh_token::IssuedRefreshToken;
use crate::configuration::JwtSettings;
use crate::domain::User;
use crate::error::{AppError, AuthError};

/// Issues access and refresh tokens and verifies access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Issue a signed access token for `user`, valid from now
    ///
    /// # Errors
    /// Returns an internal error if signing fails
    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_access_token_at(user, Utc::now())
    }

    /// Issue a signed access token as if it were `issued_at`
    ///
    /// Same user and same instant always give the same token.
    pub fn issue_access_token_at(
        &self,
        user: &User,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims::new(user, self.access_token_expiry, &self.issuer, issued_at);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(user_id = user.id, error = %e, "Error generating access token");
            AppError::Internal(format!("Token generation failed: {}", e))
        })
    }

    /// Generate a fresh refresh token expiring `refresh_token_expiry` from now
    pub fn issue_refresh_token(&self) -> IssuedRefreshToken {
        IssuedRefreshToken::new(self.refresh_token_expiry, Utc::now())
    }

    /// Verify signature, algorithm, issuer and expiry, then decode the claims
    /// into `Claims` in one step
    ///
    /// Only HS256 is accepted, so tokens re-signed under another algorithm
    /// (including `none`) fail here.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.leeway = 0;

        let payload = decode::<serde_json::Value>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "JWT validation error");
                match e.kind() {
                    ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
                    _ => AuthError::TokenInvalid,
                }
            })?;

        // Signature is good; now the payload must match the claim set exactly
        serde_json::from_value::<Claims>(payload).map_err(|e| {
            tracing::warn!(error = %e, "Access token has invalid claims");
            AuthError::InvalidClaims
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: SECRET.to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 2_592_000,
            issuer: "test".to_string(),
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            token_version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let issuer = TokenIssuer::new(&get_test_config());

        let token = issuer.issue_access_token(&user()).expect("Failed to generate token");
        let claims = issuer.verify_access_token(&token).expect("Failed to validate token");

        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.token_version, 4);
        assert_eq!(claims.exp - claims.iat, 1800);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_issuance_is_deterministic() {
        let issuer = TokenIssuer::new(&get_test_config());
        let user = user();
        let now = Utc::now();

        let first = issuer.issue_access_token_at(&user, now).unwrap();
        let second = issuer.issue_access_token_at(&user, now).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_token() {
        let issuer = TokenIssuer::new(&get_test_config());

        assert_eq!(
            issuer.verify_access_token("invalid.token.here"),
            Err(AuthError::TokenInvalid)
        );
        assert!(issuer.verify_access_token("").is_err());
    }

    #[test]
    fn test_tampered_token() {
        let issuer = TokenIssuer::new(&get_test_config());
        let token = issuer.issue_access_token(&user()).unwrap();

        let tampered = format!("{}X", token);
        assert!(issuer.verify_access_token(&tampered).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = TokenIssuer::new(&get_test_config());
        let token = issuer.issue_access_token(&user()).unwrap();

        let mut other = get_test_config();
        other.secret = "a-completely-different-secret-value".to_string();
        let other = TokenIssuer::new(&other);

        assert_eq!(other.verify_access_token(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_wrong_issuer() {
        let issuer = TokenIssuer::new(&get_test_config());
        let token = issuer.issue_access_token(&user()).unwrap();

        let mut config = get_test_config();
        config.issuer = "wrong-issuer".to_string();
        let other = TokenIssuer::new(&config);

        assert!(other.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new(&get_test_config());
        let issued_at = Utc::now() - Duration::seconds(1800 + 5);

        let token = issuer.issue_access_token_at(&user(), issued_at).unwrap();

        assert_eq!(issuer.verify_access_token(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_other_algorithm_is_rejected() {
        let issuer = TokenIssuer::new(&get_test_config());
        let claims = Claims::new(&user(), 1800, "test", Utc::now());

        // Same secret, different HMAC variant
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer.verify_access_token(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_missing_claim_is_reported_as_invalid_claims() {
        let issuer = TokenIssuer::new(&get_test_config());
        let claims = serde_json::json!({
            "user_id": 1,
            "role": "user",
            "exp": Utc::now().timestamp() + 600,
            "iat": Utc::now().timestamp(),
            "iss": "test"
        });

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer.verify_access_token(&token), Err(AuthError::InvalidClaims));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let issuer = TokenIssuer::new(&get_test_config());
        let before = Utc::now();
        let issued = issuer.issue_refresh_token();

        assert_eq!(issued.token.len(), 64);
        assert!(issued.expires_at >= before + Duration::days(30));
        assert!(issued.expires_at <= Utc::now() + Duration::days(30));
    }
}

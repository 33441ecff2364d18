/// Session Service
///
/// Registration, login and the refresh token rotation protocol. Stores are
/// injected as trait objects so the flow never depends on a storage engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::auth::jwt::TokenIssuer;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::generate_refresh_token;
use crate::domain::{NewUser, Role, User};
use crate::error::{AppError, AuthError, StoreError};
use crate::store::{RefreshTokenStore, UserStore};

/// Access + refresh token pair handed to the client
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login: the authenticated user and their fresh tokens
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    issuer: TokenIssuer,
    hash_cost: u32,
    /// Hash at `hash_cost` that unknown-username logins are verified against
    dummy_hash: String,
}

impl AuthService {
    /// # Errors
    /// `Internal` if `hash_cost` is not a usable bcrypt cost
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        issuer: TokenIssuer,
        hash_cost: u32,
    ) -> Result<Self, AppError> {
        let dummy_hash = hash_password(&generate_refresh_token(), hash_cost)?;

        Ok(Self {
            users,
            refresh_tokens,
            issuer,
            hash_cost,
            dummy_hash,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create a `user`-role account
    ///
    /// # Errors
    /// - `Store(UniqueConstraintViolation)` if the username is taken
    /// - `Internal` if hashing fails
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        let password_hash = hash_password(password, self.hash_cost)?;

        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and issue an access/refresh pair
    ///
    /// An unknown username and a wrong password produce the same
    /// `InvalidCredentials` error after the same amount of bcrypt work.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = match self.users.get_user_by_username(username).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                // Outcome is always a mismatch; only the elapsed time matters
                verify_password(password, &self.dummy_hash)?;
                tracing::info!("Login for unknown username");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = self.issuer.issue_access_token(&user)?;
        let refresh_token = self.store_new_refresh_token(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(LoginOutcome {
            user,
            tokens: TokenPair {
                access_token,
                refresh_token,
            },
        })
    }

    /// Exchange a refresh token for a new pair
    ///
    /// Steps run strictly in order, each a precondition for the next:
    /// 1. look up the presented token (absent or expired: `InvalidRefreshToken`)
    /// 2. delete it, so it can never be presented again
    /// 3. bump the owner's token version, revoking every access token issued
    ///    so far, then issue an access token carrying the new version
    /// 4. issue and store a new refresh token
    ///
    /// The steps are not one transaction. If 3 or 4 fails after 2 succeeded,
    /// the user holds no valid refresh token and has to log in again.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        let record = match self.refresh_tokens.get(presented).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                tracing::info!("Unknown refresh token presented");
                return Err(AuthError::InvalidRefreshToken.into());
            }
            Err(e) => return Err(internal("look up refresh token", e)),
        };

        if record.is_expired_at(Utc::now()) {
            tracing::info!(user_id = record.user_id, "Expired refresh token presented");
            return Err(AuthError::InvalidRefreshToken.into());
        }

        match self.refresh_tokens.delete(presented).await {
            Ok(()) => {}
            // Lost a race against a concurrent refresh with the same token
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(user_id = record.user_id, "Refresh token consumed concurrently");
                return Err(AuthError::InvalidRefreshToken.into());
            }
            Err(e) => return Err(internal("delete refresh token", e)),
        }

        self.users
            .increment_token_version(record.user_id)
            .await
            .map_err(|e| internal("increment token version", e))?;

        let user = self
            .users
            .get_user_by_id(record.user_id)
            .await
            .map_err(|e| internal("reload user", e))?;

        let access_token = self.issuer.issue_access_token(&user)?;
        let refresh_token = self.store_new_refresh_token(user.id).await?;

        tracing::info!(
            user_id = user.id,
            token_version = user.token_version,
            "Tokens rotated"
        );
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn store_new_refresh_token(&self, user_id: i64) -> Result<String, AppError> {
        let issued = self.issuer.issue_refresh_token();

        self.refresh_tokens
            .store(&issued.token, user_id, issued.expires_at)
            .await
            .map_err(|e| internal("store refresh token", e))?;

        Ok(issued.token)
    }
}

fn internal(step: &str, err: StoreError) -> AppError {
    tracing::error!(step = step, error = %err, "Token rotation step failed");
    AppError::Internal(format!("failed to {}: {}", step, err))
}

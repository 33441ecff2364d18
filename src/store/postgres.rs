/// Postgres-backed stores
///
/// Refresh tokens are hashed with SHA-256 before they touch the database;
/// the plaintext only ever exists on the client and in flight.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreResult, UserStore};
use crate::domain::{NewUser, RefreshToken, Role, User};
use crate::error::StoreError;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    token_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Unexpected(format!("user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            token_version: row.token_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Hash a refresh token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turn an optional row into a user, logging misses under `key`
fn found_user(row: Option<UserRow>, key: impl fmt::Display) -> StoreResult<User> {
    match row {
        Some(row) => row.try_into(),
        None => {
            tracing::info!(key = %key, "User not found");
            Err(StoreError::NotFound(format!("user {}", key)))
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password_hash, role, token_version, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::UniqueConstraintViolation(_) => {
                StoreError::UniqueConstraintViolation("username already exists".to_string())
            }
            other => {
                tracing::error!(username = %new_user.username, error = %other, "Error inserting user");
                other
            }
        })?;

        tracing::info!(user_id = row.id, "User created");
        row.try_into()
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, token_version, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        found_user(row, username)
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, token_version, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        found_user(row, id)
    }

    async fn increment_token_version(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET token_version = token_version + 1, updated_at = $1
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(user_id = id, error = %e, "Failed to increment token version");
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }

        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn store(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(user_id = user_id, error = %e, "Error inserting refresh token");
            StoreError::from(e)
        })?;

        Ok(())
    }

    async fn get(&self, token: &str) -> StoreResult<RefreshToken> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            SELECT user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((user_id, expires_at, created_at)) => Ok(RefreshToken {
                token: token.to_string(),
                user_id,
                expires_at,
                created_at,
            }),
            None => Err(StoreError::NotFound("refresh token".to_string())),
        }
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error deleting refresh token");
                StoreError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("refresh token".to_string()));
        }

        Ok(())
    }
}

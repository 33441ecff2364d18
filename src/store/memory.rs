use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{RefreshTokenStore, StoreResult, UserStore};
use crate::domain::{NewUser, RefreshToken, User};
use crate::error::StoreError;

#[derive(Default)]
struct State {
    users: HashMap<i64, User>,
    next_user_id: i64,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// Process-local implementation of both stores
///
/// Ids are assigned sequentially starting at 1, like a `BIGSERIAL` column.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unexpected("in-memory store lock poisoned".to_string()))
    }

    /// Number of refresh tokens currently held for a user
    pub fn refresh_token_count(&self, user_id: i64) -> StoreResult<usize> {
        let state = self.lock()?;
        Ok(state
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .count())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut state = self.lock()?;

        if state.users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::UniqueConstraintViolation(
                "username already exists".to_string(),
            ));
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.next_user_id,
            username: new_user.username,
            password_hash: new_user.password_hash,
            role: new_user.role,
            token_version: 0,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let state = self.lock()?;
        state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", username)))
    }

    async fn get_user_by_id(&self, id: i64) -> StoreResult<User> {
        let state = self.lock()?;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn increment_token_version(&self, id: i64) -> StoreResult<()> {
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;

        user.token_version += 1;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn store(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.lock()?;

        if state.refresh_tokens.contains_key(token) {
            return Err(StoreError::UniqueConstraintViolation(
                "refresh token already exists".to_string(),
            ));
        }

        state.refresh_tokens.insert(
            token.to_string(),
            RefreshToken {
                token: token.to_string(),
                user_id,
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> StoreResult<RefreshToken> {
        let state = self.lock()?;
        state
            .refresh_tokens
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }

    async fn delete(&self, token: &str) -> StoreResult<()> {
        let mut state = self.lock()?;
        state
            .refresh_tokens
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }
}

/// Storage capability interfaces
///
/// The auth core only ever talks to these traits. `PgStore` backs them with
/// Postgres; `InMemoryStore` backs them with process memory for tests and
/// database-less local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NewUser, RefreshToken, User};
use crate::error::StoreError;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user. A taken username yields `UniqueConstraintViolation`.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Find a user by username, `NotFound` if absent
    async fn get_user_by_username(&self, username: &str) -> StoreResult<User>;

    /// Find a user by id, `NotFound` if absent
    async fn get_user_by_id(&self, id: i64) -> StoreResult<User>;

    /// Atomically bump `token_version` by one
    async fn increment_token_version(&self, id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a freshly issued refresh token
    async fn store(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Look up a refresh token, `NotFound` if absent. Expiry is not checked here.
    async fn get(&self, token: &str) -> StoreResult<RefreshToken>;

    /// Remove a refresh token. `NotFound` if it was already gone, so only one
    /// of several concurrent deletes of the same token succeeds.
    async fn delete(&self, token: &str) -> StoreResult<()>;
}

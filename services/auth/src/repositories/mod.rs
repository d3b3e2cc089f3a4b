//! Persistence boundary for users and refresh tokens
//!
//! Every service operation runs inside one [`AuthTransaction`] obtained from a
//! [`TransactionManager`]. Committing applies the writes; dropping the
//! transaction without committing rolls them back.

use async_trait::async_trait;
use common::error::DatabaseResult;

use crate::models::{NewUser, RefreshToken, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// User lookups and writes
#[async_trait]
pub trait UserRepository: Send {
    /// Find an active (not soft-deleted) user by username
    async fn find_by_username(&mut self, username: &str) -> DatabaseResult<Option<User>>;

    /// Find an active (not soft-deleted) user by ID
    async fn find_by_id(&mut self, id: i64) -> DatabaseResult<Option<User>>;

    /// Whether the username is taken, soft-deleted users included
    async fn exists_by_username(&mut self, username: &str) -> DatabaseResult<bool>;

    /// Insert a new user. A taken username yields `DatabaseError::Conflict`.
    async fn create(&mut self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Persist changes to an existing user, refreshing `updated_at`
    async fn save(&mut self, user: User) -> DatabaseResult<User>;
}

/// Refresh token storage, one row per user
#[async_trait]
pub trait RefreshTokenRepository: Send {
    /// Find the stored token for a user, locking it until the transaction ends
    async fn find_by_user_id(&mut self, user_id: i64) -> DatabaseResult<Option<RefreshToken>>;

    /// Insert or replace the token stored for `token.user_id`
    async fn save(&mut self, token: RefreshToken) -> DatabaseResult<RefreshToken>;

    /// Remove the stored token. Returns whether a row was deleted.
    async fn delete_by_user_id(&mut self, user_id: i64) -> DatabaseResult<bool>;
}

/// A unit of work spanning both repositories
#[async_trait]
pub trait AuthTransaction: Send {
    fn users(&mut self) -> &mut dyn UserRepository;

    fn refresh_tokens(&mut self) -> &mut dyn RefreshTokenRepository;

    async fn commit(self: Box<Self>) -> DatabaseResult<()>;
}

/// Source of transactions
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> DatabaseResult<Box<dyn AuthTransaction>>;

    async fn health_check(&self) -> DatabaseResult<bool>;
}

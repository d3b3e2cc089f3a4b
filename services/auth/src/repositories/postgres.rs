//! PostgreSQL implementation of the repositories

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use super::{AuthTransaction, RefreshTokenRepository, TransactionManager, UserRepository};
use crate::models::{Audit, NewUser, RefreshToken, User};

/// Transaction manager backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an initialized pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))
    }
}

#[async_trait]
impl TransactionManager for PgStore {
    async fn begin(&self) -> DatabaseResult<Box<dyn AuthTransaction>> {
        let tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}

/// An open PostgreSQL transaction. Dropping it rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AuthTransaction for PgTransaction {
    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn refresh_tokens(&mut self) -> &mut dyn RefreshTokenRepository {
        self
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        self.tx.commit().await.map_err(DatabaseError::Query)
    }
}

#[async_trait]
impl UserRepository for PgTransaction {
    async fn find_by_username(&mut self, username: &str) -> DatabaseResult<Option<User>> {
        debug!("Finding user by username: {}", username);

        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, last_login_at, created_at, updated_at, deleted_at
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_by_id(&mut self, id: i64) -> DatabaseResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, last_login_at, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn exists_by_username(&mut self, username: &str) -> DatabaseResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn create(&mut self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let audit = Audit::created(Utc::now());

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, last_login_at, created_at, updated_at, deleted_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(audit.created_at)
        .bind(audit.updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DatabaseError::from_query)
    }

    async fn save(&mut self, mut user: User) -> DatabaseResult<User> {
        user.audit.touch(Utc::now());

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, password_hash = $3, last_login_at = $4,
                updated_at = $5, deleted_at = $6
            WHERE id = $1
            RETURNING id, username, password_hash, last_login_at, created_at, updated_at, deleted_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.last_login_at)
        .bind(user.audit.updated_at)
        .bind(user.audit.deleted_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DatabaseError::from_query)
    }
}

#[async_trait]
impl RefreshTokenRepository for PgTransaction {
    async fn find_by_user_id(&mut self, user_id: i64) -> DatabaseResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT user_id, value, created_at, updated_at, deleted_at
            FROM refresh_tokens
            WHERE user_id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn save(&mut self, mut token: RefreshToken) -> DatabaseResult<RefreshToken> {
        token.audit.touch(Utc::now());

        sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at, deleted_at = NULL
            RETURNING user_id, value, created_at, updated_at, deleted_at
            "#,
        )
        .bind(token.user_id)
        .bind(&token.value)
        .bind(token.audit.created_at)
        .bind(token.audit.updated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DatabaseError::from_query)
    }

    async fn delete_by_user_id(&mut self, user_id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}

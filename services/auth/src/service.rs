//! Authentication use cases: signup, login, token reissue and logout
//!
//! Each operation opens one transaction, does its reads and writes through
//! it, and commits only when everything succeeded. Returning early with `?`
//! drops the transaction, which rolls it back.

use std::sync::Arc;

use chrono::Utc;
use common::error::DatabaseError;
use tracing::{info, warn};

use crate::{
    error::{AuthError, AuthResult},
    jwt::{JwtService, JwtToken},
    models::{NewUser, RefreshToken, User},
    password::PasswordEncoder,
    rate_limiter::RateLimiter,
    repositories::TransactionManager,
    validation::{validate_password, validate_username},
};

const REFRESH_TOKEN_NOT_VALID: &str = "Refresh Token is Not Valid";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TransactionManager>,
    jwt_service: JwtService,
    password_encoder: PasswordEncoder,
    rate_limiter: RateLimiter,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn TransactionManager>,
        jwt_service: JwtService,
        password_encoder: PasswordEncoder,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            jwt_service,
            password_encoder,
            rate_limiter,
        }
    }

    /// Verify credentials and issue a token pair.
    ///
    /// The refresh token of the pair replaces whatever was stored for the user.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<JwtToken> {
        info!("Login attempt for user: {}", username);

        if !self.rate_limiter.is_allowed(username).await {
            warn!("Login rejected for rate-limited user: {}", username);
            return Err(AuthError::TooManyAttempts);
        }

        let mut tx = self.store.begin().await?;

        let Some(mut user) = tx.users().find_by_username(username).await? else {
            self.rate_limiter.record_failure(username).await;
            return Err(AuthError::business(format!(
                "User with username {} not found",
                username
            )));
        };

        if !self.password_encoder.matches(password, &user.password_hash)? {
            self.rate_limiter.record_failure(username).await;
            return Err(AuthError::business("Password is incorrect"));
        }

        user.last_login_at = Some(Utc::now());
        let user = tx.users().save(user).await?;

        let token = self.jwt_service.generate_token_pair(&user)?;
        tx.refresh_tokens()
            .save(RefreshToken::new(user.id, token.refresh_token.clone()))
            .await?;

        tx.commit().await?;
        self.rate_limiter.reset(username).await;

        info!("User {} logged in", user.id);
        Ok(token)
    }

    /// Register a new user
    pub async fn signup(&self, username: &str, password: &str) -> AuthResult<User> {
        info!("Signup attempt for user: {}", username);

        validate_username(username).map_err(AuthError::Business)?;
        validate_password(password).map_err(AuthError::Business)?;

        let mut tx = self.store.begin().await?;

        if tx.users().exists_by_username(username).await? {
            return Err(AuthError::business("Username already exists"));
        }

        let password_hash = self.password_encoder.encode(password)?;
        let new_user = NewUser {
            username: username.to_string(),
            password_hash,
        };

        let user = match tx.users().create(&new_user).await {
            Ok(user) => user,
            Err(DatabaseError::Conflict(_)) => {
                return Err(AuthError::business("Username already exists"));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        info!("User {} signed up as {}", user.id, user.username);
        Ok(user)
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// When the refresh token's remaining lifetime is under the renewal
    /// threshold, both tokens are replaced and the new refresh token is stored.
    /// Otherwise the returned pair carries the caller's refresh token unchanged.
    pub async fn reissue(&self, jwt_token: &JwtToken) -> AuthResult<JwtToken> {
        let claims = self
            .jwt_service
            .validate_refresh_token(&jwt_token.refresh_token)
            .map_err(|e| {
                warn!("Rejected refresh token: {}", e);
                AuthError::business(REFRESH_TOKEN_NOT_VALID)
            })?;

        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::business(REFRESH_TOKEN_NOT_VALID))?;

        let mut tx = self.store.begin().await?;

        let mut stored = tx
            .refresh_tokens()
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AuthError::business("Log-out user"))?;

        if stored.value != jwt_token.refresh_token {
            warn!("Stale refresh token presented for user {}", user_id);
            return Err(AuthError::business(REFRESH_TOKEN_NOT_VALID));
        }

        let user = tx
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::business("User not found"))?;

        let new_token = if self.jwt_service.is_refresh_token_renewal_required(&claims) {
            info!("Rotating refresh token for user {}", user_id);
            let token = self.jwt_service.generate_token_pair(&user)?;
            stored.value = token.refresh_token.clone();
            tx.refresh_tokens().save(stored).await?;
            token
        } else {
            JwtToken {
                access_token: self.jwt_service.generate_access_token(&user)?,
                refresh_token: stored.value,
            }
        };

        tx.commit().await?;
        Ok(new_token)
    }

    /// Drop the stored refresh token so it can no longer be reissued
    pub async fn logout(&self, user_id: i64) -> AuthResult<()> {
        let mut tx = self.store.begin().await?;
        let removed = tx.refresh_tokens().delete_by_user_id(user_id).await?;
        tx.commit().await?;

        info!("User {} logged out (session removed: {})", user_id, removed);
        Ok(())
    }

    /// Load the user behind an authenticated request
    pub async fn current_user(&self, user_id: i64) -> AuthResult<User> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::business("User not found"))?;
        tx.commit().await?;
        Ok(user)
    }

    /// Whether the persistence layer is reachable
    pub async fn health_check(&self) -> AuthResult<bool> {
        Ok(self.store.health_check().await?)
    }

    /// Access token lifetime in seconds, reported to clients
    pub fn access_token_expiry(&self) -> u64 {
        self.jwt_service.access_token_expiry()
    }
}

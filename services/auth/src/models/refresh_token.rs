//! Stored refresh token, one per user

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Audit;

/// The refresh token currently issued to a user.
///
/// Keyed by `user_id`; rotation overwrites `value` in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub user_id: i64,
    pub value: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl RefreshToken {
    pub fn new(user_id: i64, value: String) -> Self {
        Self {
            user_id,
            value,
            audit: Audit::created(chrono::Utc::now()),
        }
    }
}

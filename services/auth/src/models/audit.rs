//! Audit columns shared by every persisted entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Creation, modification and soft-deletion timestamps.
///
/// Repositories assign these on write; callers never set them by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Audit {
    /// Audit stamp for a row inserted at `now`
    pub fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Mark the row as modified at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

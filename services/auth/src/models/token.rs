//! Persisted authentication token

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Token record binding a signed key to a user and an expiry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuthToken {
    pub id: i64,
    pub key: String,
    pub user_id: Uuid,
    pub created: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl AuthToken {
    /// Whether the stored expiry has passed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// New token record payload
#[derive(Debug, Clone)]
pub struct NewAuthToken {
    pub key: String,
    pub user_id: Uuid,
    pub expiry: DateTime<Utc>,
}

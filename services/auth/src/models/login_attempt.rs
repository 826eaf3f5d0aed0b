//! Per-username login failure counter

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Consecutive failed logins for one username since its last success
///
/// The absent username (a submission without one) shares a single row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LoginAttemptRecord {
    pub id: i64,
    pub username: Option<String>,
    pub count: i32,
    pub timestamp: DateTime<Utc>,
}

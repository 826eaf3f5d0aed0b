//! Login audit trail

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One login attempt, successful or not
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LoginEventRecord {
    pub id: i64,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub os: Option<String>,
    pub forwarded_by: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// Login event payload, with metadata already extracted and clamped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoginEvent {
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub os: Option<String>,
    pub forwarded_by: String,
    pub user_agent: Option<String>,
    pub success: bool,
}

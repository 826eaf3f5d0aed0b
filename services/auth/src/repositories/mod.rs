//! Storage seams for accounts, login records and tokens
//!
//! Each store is a trait with a PostgreSQL implementation; the in-memory
//! implementation in [`memory`] backs tests and local runs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AuthToken, LoginAttemptRecord, LoginEventRecord, NewAuthToken, NewLoginEvent, NewUser, User,
};

pub mod login_attempt;
pub mod login_event;
pub mod memory;
pub mod token;
pub mod user;

pub use login_attempt::LoginAttemptRepository;
pub use login_event::LoginEventRepository;
pub use memory::MemoryStore;
pub use token::TokenRepository;
pub use user::UserRepository;

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account
    async fn create(&self, new_user: &NewUser) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Login failure counters keyed by username
#[async_trait]
pub trait LoginAttemptStore: Send + Sync {
    /// Get-or-create the row, add one to the count and refresh the timestamp
    async fn increment(&self, username: Option<&str>) -> Result<LoginAttemptRecord>;

    /// Create-or-update the row with a zero count and a fresh timestamp
    async fn reset(&self, username: Option<&str>) -> Result<LoginAttemptRecord>;

    async fn find(&self, username: Option<&str>) -> Result<Option<LoginAttemptRecord>>;
}

/// Append-only login audit trail
#[async_trait]
pub trait LoginEventStore: Send + Sync {
    async fn append(&self, event: &NewLoginEvent) -> Result<LoginEventRecord>;

    /// Most recent events first
    async fn recent(&self, limit: i64) -> Result<Vec<LoginEventRecord>>;
}

/// Issued token records
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_by_user_and_expiry(
        &self,
        user_id: Uuid,
        expiry: DateTime<Utc>,
    ) -> Result<Option<AuthToken>>;

    /// Insert the token unless one already exists for `(user_id, expiry)`,
    /// in which case the existing record is returned unchanged
    async fn get_or_create(&self, new_token: &NewAuthToken) -> Result<AuthToken>;

    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>>;

    /// Tokens of `user_id` whose expiry is after `now`
    async fn count_live(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<i64>;

    async fn update_expiry(&self, id: i64, expiry: DateTime<Utc>) -> Result<AuthToken>;
}

/// The set of stores the service runs against
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub attempts: Arc<dyn LoginAttemptStore>,
    pub events: Arc<dyn LoginEventStore>,
    pub tokens: Arc<dyn TokenStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            attempts: Arc::new(LoginAttemptRepository::new(pool.clone())),
            events: Arc::new(LoginEventRepository::new(pool.clone())),
            tokens: Arc::new(TokenRepository::new(pool)),
        }
    }

    /// Stores backed by a single in-memory store
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            attempts: store.clone(),
            events: store.clone(),
            tokens: store,
        }
    }
}

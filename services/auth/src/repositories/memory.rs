//! In-memory implementation of every store

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{LoginAttemptStore, LoginEventStore, TokenStore, UserStore};
use crate::models::{
    AuthToken, LoginAttemptRecord, LoginEventRecord, NewAuthToken, NewLoginEvent, NewUser, User,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    attempts: HashMap<Option<String>, LoginAttemptRecord>,
    events: Vec<LoginEventRecord>,
    tokens: Vec<AuthToken>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store holding accounts, counters, events and tokens behind one lock
///
/// Enforces the same uniqueness rules as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip an account's active flag
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("No user with id {}", id))?;
        user.is_active = is_active;
        user.updated_at = Utc::now();
        Ok(())
    }

    /// Number of token records held
    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: &NewUser) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if inner
            .users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            anyhow::bail!("duplicate key value violates unique constraint on accounts");
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&id).cloned())
    }
}

#[async_trait]
impl LoginAttemptStore for MemoryStore {
    async fn increment(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let mut inner = self.inner.lock().await;
        let key = username.map(str::to_owned);

        if !inner.attempts.contains_key(&key) {
            let id = inner.next_id();
            inner.attempts.insert(
                key.clone(),
                LoginAttemptRecord {
                    id,
                    username: key.clone(),
                    count: 0,
                    timestamp: Utc::now(),
                },
            );
        }

        let record = inner
            .attempts
            .get_mut(&key)
            .ok_or_else(|| anyhow::anyhow!("Login attempt record missing"))?;
        record.count += 1;
        record.timestamp = Utc::now();

        Ok(record.clone())
    }

    async fn reset(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let mut inner = self.inner.lock().await;
        let key = username.map(str::to_owned);
        let existing_id = inner.attempts.get(&key).map(|r| r.id);
        let id = match existing_id {
            Some(id) => id,
            None => inner.next_id(),
        };

        let record = LoginAttemptRecord {
            id,
            username: key.clone(),
            count: 0,
            timestamp: Utc::now(),
        };
        inner.attempts.insert(key, record.clone());

        Ok(record)
    }

    async fn find(&self, username: Option<&str>) -> Result<Option<LoginAttemptRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.attempts.get(&username.map(str::to_owned)).cloned())
    }
}

#[async_trait]
impl LoginEventStore for MemoryStore {
    async fn append(&self, event: &NewLoginEvent) -> Result<LoginEventRecord> {
        let mut inner = self.inner.lock().await;
        let record = LoginEventRecord {
            id: inner.next_id(),
            username: event.username.clone(),
            ip_address: event.ip_address.clone(),
            os: event.os.clone(),
            forwarded_by: event.forwarded_by.clone(),
            user_agent: event.user_agent.clone(),
            success: event.success,
            created_at: Utc::now(),
        };
        inner.events.push(record.clone());

        Ok(record)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LoginEventRecord>> {
        let inner = self.inner.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(inner.events.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_by_user_and_expiry(
        &self,
        user_id: Uuid,
        expiry: DateTime<Utc>,
    ) -> Result<Option<AuthToken>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .iter()
            .find(|t| t.user_id == user_id && t.expiry == expiry)
            .cloned())
    }

    async fn get_or_create(&self, new_token: &NewAuthToken) -> Result<AuthToken> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner
            .tokens
            .iter()
            .find(|t| t.user_id == new_token.user_id && t.expiry == new_token.expiry)
        {
            return Ok(existing.clone());
        }

        if inner
            .tokens
            .iter()
            .any(|t| t.key == new_token.key && t.expiry == new_token.expiry)
        {
            anyhow::bail!("duplicate key value violates unique constraint on (key, expiry)");
        }

        let token = AuthToken {
            id: inner.next_id(),
            key: new_token.key.clone(),
            user_id: new_token.user_id,
            created: Utc::now(),
            expiry: new_token.expiry,
        };
        inner.tokens.push(token.clone());

        Ok(token)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .iter()
            .filter(|t| t.key == key)
            .max_by_key(|t| t.expiry)
            .cloned())
    }

    async fn count_live(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
        let inner = self.inner.lock().await;
        let count = inner
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.expiry > now)
            .count();
        Ok(i64::try_from(count)?)
    }

    async fn update_expiry(&self, id: i64, expiry: DateTime<Utc>) -> Result<AuthToken> {
        let mut inner = self.inner.lock().await;
        let token = inner
            .tokens
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("No token with id {}", id))?;
        token.expiry = expiry;
        Ok(token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_increment_creates_then_counts() -> Result<()> {
        let store = MemoryStore::new();

        let first = store.increment(Some("alice")).await?;
        assert_eq!(first.count, 1);

        let second = store.increment(Some("alice")).await?;
        assert_eq!(second.count, 2);
        assert_eq!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_zeroes_existing_and_creates_missing() -> Result<()> {
        let store = MemoryStore::new();

        for _ in 0..4 {
            store.increment(Some("bob")).await?;
        }
        let reset = store.reset(Some("bob")).await?;
        assert_eq!(reset.count, 0);

        let fresh = store.reset(Some("carol")).await?;
        assert_eq!(fresh.count, 0);
        assert!(store.find(Some("carol")).await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_absent_username_shares_one_counter() -> Result<()> {
        let store = MemoryStore::new();

        store.increment(None).await?;
        let record = store.increment(None).await?;
        assert_eq!(record.count, 2);
        assert_eq!(record.username, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_recent_events_newest_first() -> Result<()> {
        let store = MemoryStore::new();

        for name in ["first", "second", "third"] {
            store
                .append(&NewLoginEvent {
                    username: Some(name.to_string()),
                    ip_address: None,
                    os: None,
                    forwarded_by: String::new(),
                    user_agent: None,
                    success: false,
                })
                .await?;
        }

        let recent = store.recent(2).await?;
        let names: Vec<_> = recent.iter().filter_map(|e| e.username.as_deref()).collect();
        assert_eq!(names, ["third", "second"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_accounts_rejected() -> Result<()> {
        let store = MemoryStore::new();

        store.create(&new_user("dave", "dave@example.com")).await?;
        assert!(store.create(&new_user("dave", "other@example.com")).await.is_err());
        assert!(store.create(&new_user("other", "dave@example.com")).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing_for_same_bucket() -> Result<()> {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let expiry = Utc::now();

        let first = store
            .get_or_create(&NewAuthToken {
                key: "first".to_string(),
                user_id,
                expiry,
            })
            .await?;
        let second = store
            .get_or_create(&NewAuthToken {
                key: "second".to_string(),
                user_id,
                expiry,
            })
            .await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.key, "first");
        assert_eq!(store.token_count().await, 1);

        Ok(())
    }
}

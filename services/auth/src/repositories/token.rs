//! Token repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::TokenStore;
use crate::models::{AuthToken, NewAuthToken};

/// PostgreSQL token records
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn find_by_user_and_expiry(
        &self,
        user_id: Uuid,
        expiry: DateTime<Utc>,
    ) -> Result<Option<AuthToken>> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT id, key, user_id, created, expiry
            FROM auth_tokens
            WHERE user_id = $1 AND expiry = $2
            "#,
        )
        .bind(user_id)
        .bind(expiry)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn get_or_create(&self, new_token: &NewAuthToken) -> Result<AuthToken> {
        let inserted = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (key, user_id, expiry)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, expiry) DO NOTHING
            RETURNING id, key, user_id, created, expiry
            "#,
        )
        .bind(&new_token.key)
        .bind(new_token.user_id)
        .bind(new_token.expiry)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(token) = inserted {
            return Ok(token);
        }

        // Lost the race to a concurrent login in the same expiry bucket.
        self.find_by_user_and_expiry(new_token.user_id, new_token.expiry)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Token for user {} vanished", new_token.user_id))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT id, key, user_id, created, expiry
            FROM auth_tokens
            WHERE key = $1
            ORDER BY expiry DESC
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn count_live(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM auth_tokens
            WHERE user_id = $1 AND expiry > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn update_expiry(&self, id: i64, expiry: DateTime<Utc>) -> Result<AuthToken> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            UPDATE auth_tokens
            SET expiry = $2
            WHERE id = $1
            RETURNING id, key, user_id, created, expiry
            "#,
        )
        .bind(id)
        .bind(expiry)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }
}

//! Login attempt counter repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::LoginAttemptStore;
use crate::models::LoginAttemptRecord;

/// PostgreSQL login attempt counters
///
/// Both writes are single upserts against the `NULLS NOT DISTINCT` unique
/// constraint on `username`.
#[derive(Clone)]
pub struct LoginAttemptRepository {
    pool: PgPool,
}

impl LoginAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptStore for LoginAttemptRepository {
    async fn increment(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let record = sqlx::query_as::<_, LoginAttemptRecord>(
            r#"
            INSERT INTO login_attempt_records (username, count, timestamp)
            VALUES ($1, 1, NOW())
            ON CONFLICT (username) DO UPDATE
            SET count = login_attempt_records.count + 1, timestamp = NOW()
            RETURNING id, username, count, timestamp
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn reset(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let record = sqlx::query_as::<_, LoginAttemptRecord>(
            r#"
            INSERT INTO login_attempt_records (username, count, timestamp)
            VALUES ($1, 0, NOW())
            ON CONFLICT (username) DO UPDATE
            SET count = 0, timestamp = NOW()
            RETURNING id, username, count, timestamp
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find(&self, username: Option<&str>) -> Result<Option<LoginAttemptRecord>> {
        let record = sqlx::query_as::<_, LoginAttemptRecord>(
            r#"
            SELECT id, username, count, timestamp
            FROM login_attempt_records
            WHERE username IS NOT DISTINCT FROM $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

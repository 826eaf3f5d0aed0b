//! Login event repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::LoginEventStore;
use crate::models::{LoginEventRecord, NewLoginEvent};

/// PostgreSQL login audit trail
#[derive(Clone)]
pub struct LoginEventRepository {
    pool: PgPool,
}

impl LoginEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginEventStore for LoginEventRepository {
    async fn append(&self, event: &NewLoginEvent) -> Result<LoginEventRecord> {
        let record = sqlx::query_as::<_, LoginEventRecord>(
            r#"
            INSERT INTO login_event_records
                (username, ip_address, os, forwarded_by, user_agent, success)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, ip_address, os, forwarded_by, user_agent, success, created_at
            "#,
        )
        .bind(&event.username)
        .bind(&event.ip_address)
        .bind(&event.os)
        .bind(&event.forwarded_by)
        .bind(&event.user_agent)
        .bind(event.success)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LoginEventRecord>> {
        let records = sqlx::query_as::<_, LoginEventRecord>(
            r#"
            SELECT id, username, ip_address, os, forwarded_by, user_agent, success, created_at
            FROM login_event_records
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

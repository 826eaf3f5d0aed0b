//! Login failure counter

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::{models::LoginAttemptRecord, repositories::LoginAttemptStore};

/// Counts consecutive failed logins per username
///
/// Observational only: nothing here blocks a login.
#[derive(Clone)]
pub struct LoginAttemptCounter {
    attempts: Arc<dyn LoginAttemptStore>,
}

impl LoginAttemptCounter {
    pub fn new(attempts: Arc<dyn LoginAttemptStore>) -> Self {
        Self { attempts }
    }

    /// Add one failure for `username`
    pub async fn increment(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let record = self.attempts.increment(username).await?;
        warn!(
            "Failed login #{} for {:?}",
            record.count, record.username
        );
        Ok(record)
    }

    /// Clear the failures of `username` after a successful login
    pub async fn reset(&self, username: Option<&str>) -> Result<LoginAttemptRecord> {
        let record = self.attempts.reset(username).await?;
        info!("Reset failed login count for {:?}", record.username);
        Ok(record)
    }

    /// Current failure count, zero for a username never seen
    pub async fn count(&self, username: Option<&str>) -> Result<i32> {
        Ok(self
            .attempts
            .find(username)
            .await?
            .map(|record| record.count)
            .unwrap_or(0))
    }
}

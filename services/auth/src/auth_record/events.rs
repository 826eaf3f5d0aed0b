//! Login audit trail writer

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::user_agent::detect_os;
use crate::{
    client_info::ClientInfo,
    models::{LoginEventRecord, NewLoginEvent},
    repositories::LoginEventStore,
};

/// Column width of `user_agent`
pub const USER_AGENT_MAX_LENGTH: usize = 1000;
/// Column width of `ip_address`
pub const IP_ADDRESS_MAX_LENGTH: usize = 40;
/// Column width of `os`
pub const OS_MAX_LENGTH: usize = 40;
/// Column width of `forwarded_by`
pub const FORWARDED_BY_MAX_LENGTH: usize = 1000;

/// Keep at most `max` characters of `value`
pub fn truncate(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

/// Resolve the client IP and the proxy chain a request traversed
///
/// Without `X-Forwarded-For` the peer address is the client and there are
/// no proxies. Otherwise the first forwarded entry is the client, and the
/// chain is the peer address followed by the remaining entries, nearest
/// proxy first.
pub fn extract_ip_address(
    remote_addr: Option<&str>,
    forwarded_for: Option<&str>,
) -> (Option<String>, Vec<String>) {
    let Some(forwarded_for) = forwarded_for else {
        return (remote_addr.map(str::to_owned), Vec::new());
    };

    let mut forwarded: Vec<String> = forwarded_for
        .split(',')
        .map(|ip| ip.trim().to_string())
        .collect();
    let client_ip = forwarded.remove(0);
    forwarded.reverse();

    let proxies = remote_addr
        .map(str::to_owned)
        .into_iter()
        .chain(forwarded)
        .collect();

    (Some(client_ip), proxies)
}

/// Build the event row for one attempt, clamping every column to its width
pub fn extract_log_info(
    username: Option<&str>,
    client: &ClientInfo,
    success: bool,
) -> NewLoginEvent {
    let (ip_address, proxies) = extract_ip_address(
        client.remote_addr.as_deref(),
        client.forwarded_for.as_deref(),
    );

    let os = client
        .user_agent
        .as_deref()
        .and_then(detect_os)
        .map(|os| truncate(&os, OS_MAX_LENGTH));

    NewLoginEvent {
        username: username.map(str::to_owned),
        ip_address: ip_address.map(|ip| truncate(&ip, IP_ADDRESS_MAX_LENGTH)),
        os,
        forwarded_by: truncate(&proxies.join(","), FORWARDED_BY_MAX_LENGTH),
        user_agent: client
            .user_agent
            .as_deref()
            .map(|ua| truncate(ua, USER_AGENT_MAX_LENGTH)),
        success,
    }
}

/// Appends one audit record per login attempt
#[derive(Clone)]
pub struct LoginLogger {
    events: Arc<dyn LoginEventStore>,
}

impl LoginLogger {
    pub fn new(events: Arc<dyn LoginEventStore>) -> Self {
        Self { events }
    }

    /// Record an attempt, successful or not
    pub async fn record(
        &self,
        username: Option<&str>,
        client: &ClientInfo,
        success: bool,
    ) -> Result<LoginEventRecord> {
        let event = extract_log_info(username, client, success);
        let record = self.events.append(&event).await?;

        info!(
            "Recorded {} login for {:?} from {:?}",
            if success { "successful" } else { "failed" },
            record.username,
            record.ip_address
        );

        Ok(record)
    }

    pub async fn log_login(
        &self,
        username: Option<&str>,
        client: &ClientInfo,
    ) -> Result<LoginEventRecord> {
        self.record(username, client, true).await
    }

    pub async fn log_failed_login(
        &self,
        username: Option<&str>,
        client: &ClientInfo,
    ) -> Result<LoginEventRecord> {
        self.record(username, client, false).await
    }

    /// Most recent events first
    pub async fn recent(&self, limit: i64) -> Result<Vec<LoginEventRecord>> {
        self.events.recent(limit).await
    }
}

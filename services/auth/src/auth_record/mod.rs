//! Login bookkeeping: the failure counter and the audit trail

pub mod attempts;
pub mod events;
pub mod user_agent;

pub use attempts::LoginAttemptCounter;
pub use events::LoginLogger;

//! Authentication service models

pub mod login_attempt;
pub mod login_event;
pub mod token;
pub mod user;

// Re-export for convenience
pub use login_attempt::LoginAttemptRecord;
pub use login_event::{LoginEventRecord, NewLoginEvent};
pub use token::{AuthToken, NewAuthToken};
pub use user::{NewUser, User};

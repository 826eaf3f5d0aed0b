//! The login flow: validate, record, issue

use anyhow::Result;
use tracing::info;

use crate::{
    auth_record::{LoginAttemptCounter, LoginLogger},
    client_info::ClientInfo,
    credentials::{CredentialValidator, LoginForm},
    error::AuthError,
    models::{AuthToken, User},
    repositories::Stores,
    tokens::TokenIssuer,
};

/// Authenticates a submission and issues a token on success
#[derive(Clone)]
pub struct LoginService {
    validator: CredentialValidator,
    logger: LoginLogger,
    attempts: LoginAttemptCounter,
    issuer: TokenIssuer,
}

impl LoginService {
    pub fn new(stores: &Stores, issuer: TokenIssuer) -> Self {
        let logger = LoginLogger::new(stores.events.clone());
        let attempts = LoginAttemptCounter::new(stores.attempts.clone());
        let validator =
            CredentialValidator::new(stores.users.clone(), logger.clone(), attempts.clone());

        Self {
            validator,
            logger,
            attempts,
            issuer,
        }
    }

    /// Run one login attempt
    ///
    /// Failures have already been recorded when the error comes back. Events
    /// and counters are keyed by the username as submitted, before trimming.
    pub async fn login(
        &self,
        form: &LoginForm,
        client: &ClientInfo,
    ) -> Result<(User, AuthToken), AuthError> {
        let user = self.validator.validate(form, client).await?;
        let username = form.submitted_username();

        self.logger.log_login(username, client).await?;
        self.attempts.reset(username).await?;

        let token = self.issuer.issue(&user).await?;
        info!("User {} logged in", user.id);

        Ok((user, token))
    }

    /// Audit trail access for the listing endpoint
    pub fn logger(&self) -> &LoginLogger {
        &self.logger
    }

    /// Current failure count for a username
    pub async fn failed_attempts(&self, username: Option<&str>) -> Result<i32> {
        self.attempts.count(username).await
    }
}

//! Credential submission and validation

use std::sync::Arc;

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Form, Json, async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth_record::{LoginAttemptCounter, LoginLogger},
    client_info::ClientInfo,
    error::AuthError,
    models::User,
    repositories::UserStore,
};

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored PHC string
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Login submission
///
/// Accepted as JSON, urlencoded form or multipart body. Both fields are
/// optional at this stage so a partial submission still reaches the
/// failure bookkeeping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginForm {
    /// Supplied username with surrounding whitespace removed
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().map(str::trim)
    }

    /// Username exactly as submitted, used for the audit trail and counters
    pub fn submitted_username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Supplied password, blank counts as missing
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[async_trait]
impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(form) = Json::<LoginForm>::from_request(req, state)
                .await
                .map_err(|e| AuthError::BadRequest(e.body_text()))?;
            Ok(form)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<LoginForm>::from_request(req, state)
                .await
                .map_err(|e| AuthError::BadRequest(e.body_text()))?;
            Ok(form)
        } else if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AuthError::BadRequest(e.body_text()))?;

            let mut form = LoginForm::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| AuthError::BadRequest(e.body_text()))?
            {
                let name = field.name().map(str::to_owned);
                let slot = match name.as_deref() {
                    Some("username") => &mut form.username,
                    Some("password") => &mut form.password,
                    _ => continue,
                };
                *slot = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AuthError::BadRequest(e.body_text()))?,
                );
            }
            Ok(form)
        } else {
            Err(AuthError::UnsupportedMediaType)
        }
    }
}

/// Checks credentials against the credential store
///
/// Every failure is paired with a failed login event and a counter
/// increment before the error is returned.
#[derive(Clone)]
pub struct CredentialValidator {
    users: Arc<dyn UserStore>,
    logger: LoginLogger,
    attempts: LoginAttemptCounter,
}

impl CredentialValidator {
    pub fn new(
        users: Arc<dyn UserStore>,
        logger: LoginLogger,
        attempts: LoginAttemptCounter,
    ) -> Self {
        Self {
            users,
            logger,
            attempts,
        }
    }

    /// Validate a submission, returning the resolved user
    pub async fn validate(
        &self,
        form: &LoginForm,
        client: &ClientInfo,
    ) -> Result<User, AuthError> {
        let username = form.username().filter(|u| !u.is_empty());

        let (Some(username), Some(password)) = (username, form.password()) else {
            self.record_failure(form.submitted_username(), client).await?;
            return Err(AuthError::MissingCredentials);
        };

        match self.authenticate(username, password).await? {
            Some(user) => Ok(user),
            None => {
                self.record_failure(form.submitted_username(), client).await?;
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve the identifier and check the password
    ///
    /// Unknown accounts, inactive accounts and wrong passwords all yield
    /// `None`.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.resolve(identifier).await? else {
            return Ok(None);
        };

        if !user.is_active || !verify_password(&user.password_hash, password)? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Look up an account by email when the identifier contains `@`,
    /// by username otherwise
    pub async fn resolve(&self, identifier: &str) -> Result<Option<User>> {
        if identifier.contains('@') {
            self.users.find_by_email(identifier).await
        } else {
            self.users.find_by_username(identifier).await
        }
    }

    async fn record_failure(&self, username: Option<&str>, client: &ClientInfo) -> Result<()> {
        info!("Rejected login for {:?}", username);
        self.logger.log_failed_login(username, client).await?;
        self.attempts.increment(username).await?;
        Ok(())
    }
}

//! Token and server settings
//!
//! Token settings are read once at startup and handed to the JWT service,
//! the token issuer and the token verifier as an explicit value.

use anyhow::Result;
use chrono::Duration;
use config::{Config, Environment};
use serde::Deserialize;

/// Token issuance settings
///
/// Every key can be overridden through an `AUTH_TOKEN_<KEY>` environment
/// variable, e.g. `AUTH_TOKEN_TOKEN_EXPIRY=600`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokenSettings {
    /// HMAC algorithm used to sign tokens (HS256, HS384 or HS512)
    pub hash_algorithm: String,
    /// Symmetric signing secret, defaults to `SECRET_KEY`
    pub jwt_secret_key: String,
    /// Declared maximum length of generated identifiers; signed keys are not truncated
    pub auth_token_character_length: usize,
    /// Token lifetime in seconds
    pub token_expiry: u64,
    /// Number of live tokens per user above which issuance logs a warning
    #[serde(default)]
    pub token_limit_per_user: Option<u32>,
    /// Move a token's stored expiry forward when it is used
    pub auto_refresh: bool,
    /// Minimum gain in seconds before an auto refresh rewrites the expiry
    pub min_refresh_interval: u64,
    /// Scheme expected in the `Authorization` header
    pub auth_header_prefix: String,
    /// `chrono` format string for the `expiry` field, RFC 3339 when unset
    #[serde(default)]
    pub expiry_datetime_format: Option<String>,
}

impl AuthTokenSettings {
    /// Load the settings from defaults and `AUTH_TOKEN_*` environment variables
    ///
    /// # Environment Variables
    /// - `SECRET_KEY`: application secret, used when `AUTH_TOKEN_JWT_SECRET_KEY` is not set
    /// - `AUTH_TOKEN_*`: per-key overrides
    pub fn from_env() -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("hash_algorithm", "HS256")?
            .set_default("auth_token_character_length", 64)?
            .set_default("token_expiry", 3000)?
            .set_default("auto_refresh", false)?
            .set_default("min_refresh_interval", 60)?
            .set_default("auth_header_prefix", "Token")?;

        if let Ok(secret) = std::env::var("SECRET_KEY") {
            builder = builder.set_default("jwt_secret_key", secret)?;
        }

        let settings: Self = builder
            .add_source(Environment::with_prefix("AUTH_TOKEN").try_parsing(true))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid auth token settings: {}", e))?;

        if settings.jwt_secret_key.is_empty() {
            anyhow::bail!("JWT secret key must not be empty");
        }

        Ok(settings)
    }

    /// Token lifetime as a duration
    pub fn token_lifetime(&self) -> Duration {
        i64::try_from(self.token_expiry)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Settings with the stock defaults and the given secret
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            hash_algorithm: "HS256".to_string(),
            jwt_secret_key: secret.into(),
            auth_token_character_length: 64,
            token_expiry: 3000,
            token_limit_per_user: None,
            auto_refresh: false,
            min_refresh_interval: 60,
            auth_header_prefix: "Token".to_string(),
            expiry_datetime_format: None,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the service binds to
    pub bind_address: String,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDRESS`: listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Self {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self { bind_address }
    }
}

//! Token issuance and verification

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{info, warn};

use crate::{
    error::AuthError,
    jwt::{JwtService, TokenError},
    models::{AuthToken, NewAuthToken, User},
    repositories::{TokenStore, UserStore},
    settings::AuthTokenSettings,
};

/// Mints token records for authenticated users
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: JwtService,
    tokens: Arc<dyn TokenStore>,
    lifetime: Duration,
    limit_per_user: Option<u32>,
}

impl TokenIssuer {
    pub fn new(
        settings: &AuthTokenSettings,
        jwt: JwtService,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            jwt,
            tokens,
            lifetime: settings.token_lifetime(),
            limit_per_user: settings.token_limit_per_user,
        }
    }

    /// Issue a token for `user` based on the current time
    pub async fn issue(&self, user: &User) -> Result<AuthToken> {
        self.issue_at(user, Utc::now()).await
    }

    /// Issue a token whose stored expiry is `now + lifetime`
    ///
    /// The stored expiry is kept at whole-second precision; a second request
    /// landing on the same expiry gets the existing record back. The signed
    /// key reads the clock again for its own `exp` claim.
    pub async fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<AuthToken> {
        let expiry = expiry_bucket(now, self.lifetime)?;

        if let Some(existing) = self.tokens.find_by_user_and_expiry(user.id, expiry).await? {
            info!("Reusing token {} for user {}", existing.id, user.id);
            return Ok(existing);
        }

        if let Some(limit) = self.limit_per_user {
            let live = self.tokens.count_live(user.id, now).await?;
            if live >= i64::from(limit) {
                warn!(
                    "User {} already holds {} live tokens (limit {})",
                    user.id, live, limit
                );
            }
        }

        let key = self.jwt.sign(user.id)?;
        let token = self
            .tokens
            .get_or_create(&NewAuthToken {
                key,
                user_id: user.id,
                expiry,
            })
            .await?;

        info!("Issued token {} for user {}", token.id, user.id);
        Ok(token)
    }
}

fn expiry_bucket(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>> {
    let expiry = now
        .checked_add_signed(lifetime)
        .ok_or_else(|| anyhow::anyhow!("Token lifetime overflows the calendar"))?;
    Ok(expiry.with_nanosecond(0).unwrap_or(expiry))
}

/// Resolves presented keys to their token record and user
#[derive(Clone)]
pub struct TokenVerifier {
    jwt: JwtService,
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    lifetime: Duration,
    auto_refresh: bool,
    min_refresh_interval: Duration,
}

impl TokenVerifier {
    pub fn new(
        settings: &AuthTokenSettings,
        jwt: JwtService,
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let min_refresh_interval = i64::try_from(settings.min_refresh_interval)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        Self {
            jwt,
            tokens,
            users,
            lifetime: settings.token_lifetime(),
            auto_refresh: settings.auto_refresh,
            min_refresh_interval,
        }
    }

    /// Authenticate a presented key
    ///
    /// With auto refresh on, the stored expiry alone decides whether the
    /// token is still live, since refreshing moves it past the signed `exp`.
    pub async fn authenticate(&self, key: &str) -> Result<(User, AuthToken), AuthError> {
        let claims = if self.auto_refresh {
            self.jwt.decode_ignoring_expiry(key)
        } else {
            self.jwt.decode(key)
        };
        let claims = claims.map_err(|e| match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid(_) => AuthError::Unauthorized,
        })?;

        let token = self
            .tokens
            .find_by_key(key)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let now = Utc::now();
        if token.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }

        if token.user_id != claims.sub {
            warn!("Token {} does not belong to its subject", token.id);
            return Err(AuthError::Unauthorized);
        }

        let user = self
            .users
            .find_by_id(token.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::Unauthorized)?;

        let token = if self.auto_refresh {
            self.renew(token, now).await?
        } else {
            token
        };

        Ok((user, token))
    }

    /// Push the stored expiry to `now + lifetime` when that gains more than
    /// the minimum refresh interval
    async fn renew(&self, token: AuthToken, now: DateTime<Utc>) -> Result<AuthToken> {
        let new_expiry = expiry_bucket(now, self.lifetime)?;
        if new_expiry - token.expiry <= self.min_refresh_interval {
            return Ok(token);
        }

        info!("Refreshing expiry of token {}", token.id);
        self.tokens.update_expiry(token.id, new_expiry).await
    }
}

//! JWT service for token signing and verification
//!
//! Tokens are HMAC-signed with the configured secret and algorithm. The
//! signed payload carries its own `exp` claim, computed from the clock at
//! signing time.

use std::str::FromStr;

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::settings::AuthTokenSettings;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Unique token ID
    pub jti: Uuid,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Token verification failure
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature and structure are valid but `exp` has passed
    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed payload or any other decode failure
    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lenient_validation: Validation,
    lifetime: Duration,
}

impl JwtService {
    /// Initialize a new JWT service from the token settings
    ///
    /// Only the HMAC family is accepted since the secret is symmetric.
    pub fn new(settings: &AuthTokenSettings) -> Result<Self> {
        let algorithm = Algorithm::from_str(&settings.hash_algorithm).map_err(|e| {
            anyhow::anyhow!(
                "Unknown hash algorithm {}: {}",
                settings.hash_algorithm,
                e
            )
        })?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            anyhow::bail!(
                "Hash algorithm {:?} needs a key pair, only HMAC algorithms are supported",
                algorithm
            );
        }

        if settings.jwt_secret_key.is_empty() {
            anyhow::bail!("JWT secret key must not be empty");
        }

        let secret = settings.jwt_secret_key.as_bytes();
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        let mut lenient_validation = validation.clone();
        lenient_validation.validate_exp = false;

        Ok(JwtService {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lenient_validation,
            lifetime: settings.token_lifetime(),
        })
    }

    /// Sign a fresh token for a user
    ///
    /// Reads the clock itself, independently of any expiry the caller
    /// stores alongside the token.
    pub fn sign(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let expiry = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| anyhow::anyhow!("Token lifetime overflows the calendar"))?;

        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        self.encode_claims(&claims)
    }

    /// Encode arbitrary claims with the configured key and algorithm
    pub fn encode_claims(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(self.algorithm), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Decode and validate a token
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }

    /// Decode a token checking only its signature and structure
    ///
    /// For tokens whose lifetime is governed by a stored expiry that may have
    /// moved past the signed `exp` claim.
    pub fn decode_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.lenient_validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    /// Get the configured algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

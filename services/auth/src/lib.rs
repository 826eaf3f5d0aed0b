//! Token-issuing authentication service for the daybook household app
//!
//! Accounts log in with a username or email and a password. Every attempt
//! lands in the login audit trail and updates the per-username failure
//! counter; a successful one returns a signed, time-limited token.

pub mod auth_record;
pub mod client_info;
pub mod credentials;
pub mod database;
pub mod error;
pub mod jwt;
pub mod login;
pub mod middleware;
pub mod models;
pub mod projection;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod tokens;
pub mod validation;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::{
    jwt::JwtService,
    login::LoginService,
    models::User,
    projection::{IdentityProjection, UserProjection},
    repositories::{Stores, UserStore},
    settings::AuthTokenSettings,
    tokens::{TokenIssuer, TokenVerifier},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AuthTokenSettings>,
    pub users: Arc<dyn UserStore>,
    pub login_service: LoginService,
    pub token_verifier: TokenVerifier,
    pub user_projection: Option<Arc<dyn UserProjection>>,
}

impl AppState {
    /// Wire the services over a set of stores, projecting users with
    /// [`IdentityProjection`]
    pub fn new(settings: AuthTokenSettings, stores: Stores) -> Result<Self> {
        let jwt = JwtService::new(&settings)?;
        let issuer = TokenIssuer::new(&settings, jwt.clone(), stores.tokens.clone());
        let token_verifier =
            TokenVerifier::new(&settings, jwt, stores.tokens.clone(), stores.users.clone());

        Ok(Self {
            settings: Arc::new(settings),
            users: stores.users.clone(),
            login_service: LoginService::new(&stores, issuer),
            token_verifier,
            user_projection: Some(Arc::new(IdentityProjection)),
        })
    }

    /// Replace the user projection; `None` drops `user` from token responses
    pub fn with_user_projection(mut self, projection: Option<Arc<dyn UserProjection>>) -> Self {
        self.user_projection = projection;
        self
    }

    /// Project a user through the installed projection, if any
    pub fn project(&self, user: &User) -> Option<Value> {
        self.user_projection
            .as_ref()
            .map(|projection| projection.project(user))
    }

    /// Project a user, falling back to the identity projection
    pub fn project_or_default(&self, user: &User) -> Value {
        self.project(user)
            .unwrap_or_else(|| IdentityProjection.project(user))
    }
}

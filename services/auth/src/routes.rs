//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use tracing::{info, warn};

use crate::{
    AppState,
    client_info::ClientInfo,
    credentials::{LoginForm, hash_password},
    error::{AuthError, AuthResult},
    middleware::{AuthenticatedUser, auth_middleware},
    models::{LoginEventRecord, NewUser},
    repositories::UserStore,
    validation::validate_new_account,
};

/// Response for token issuance
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub expiry: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

/// Request for account registration
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Query for the login event listing
#[derive(Debug, Deserialize)]
pub struct LoginEventQuery {
    pub limit: Option<i64>,
}

const DEFAULT_EVENT_LIMIT: i64 = 50;
const MAX_EVENT_LIMIT: i64 = 500;

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/accounts/me", get(current_account))
        .route("/auth/login-events", get(login_events))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/token", post(obtain_token))
        .route("/accounts", post(create_account))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Exchange credentials for a token
pub async fn obtain_token(
    State(state): State<AppState>,
    client: ClientInfo,
    form: LoginForm,
) -> AuthResult<Json<TokenResponse>> {
    info!("Login attempt for user: {:?}", form.username());

    let (user, token) = state.login_service.login(&form, &client).await?;

    Ok(Json(TokenResponse {
        expiry: format_expiry(token.expiry, state.settings.expiry_datetime_format.as_deref()),
        token: token.key,
        user: state.project(&user),
    }))
}

/// Register a new account
pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    let email = payload.email.trim().to_lowercase();

    validate_new_account(username, &email, &payload.password).map_err(AuthError::BadRequest)?;

    if state.users.find_by_username(username).await?.is_some() {
        return Err(AuthError::Conflict("Username already taken".to_string()));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AuthError::Conflict("Email already registered".to_string()));
    }

    let user = state
        .users
        .create(&NewUser {
            username: username.to_string(),
            email,
            password_hash: hash_password(&payload.password)?,
        })
        .await?;

    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(state.project_or_default(&user))))
}

/// The account behind the presented token
pub async fn current_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<Value> {
    Json(state.project_or_default(&auth.user))
}

/// Recent login attempts, newest first
pub async fn login_events(
    State(state): State<AppState>,
    Query(query): Query<LoginEventQuery>,
) -> AuthResult<Json<Vec<LoginEventRecord>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    let events = state.login_service.logger().recent(limit).await?;
    Ok(Json(events))
}

/// Render an expiry with a `chrono` format string, RFC 3339 by default
///
/// A format string chrono cannot render falls back to RFC 3339.
pub fn format_expiry(expiry: DateTime<Utc>, format: Option<&str>) -> String {
    if let Some(format) = format {
        let mut rendered = String::new();
        if write!(rendered, "{}", expiry.format(format)).is_ok() {
            return rendered;
        }
        warn!("Unusable expiry format {:?}", format);
    }

    expiry.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

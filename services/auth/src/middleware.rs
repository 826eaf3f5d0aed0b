//! Token authentication guard

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    AppState,
    error::AuthError,
    models::{AuthToken, User},
};

/// User resolved from the request's token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: AuthToken,
}

/// Split `<scheme> <key>` and check the scheme against `prefix`, ignoring case
pub fn parse_authorization<'a>(header: &'a str, prefix: &str) -> Option<&'a str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();

    if !scheme.eq_ignore_ascii_case(prefix) || key.is_empty() || key.contains(' ') {
        return None;
    }

    Some(key)
}

/// Extract and verify the token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let key = parse_authorization(auth_header, &state.settings.auth_header_prefix)
        .ok_or(AuthError::Unauthorized)?;

    let (user, token) = state.token_verifier.authenticate(key).await?;
    debug!("Authenticated user {} with token {}", user.id, token.id);

    req.extensions_mut()
        .insert(AuthenticatedUser { user, token });

    Ok(next.run(req).await)
}

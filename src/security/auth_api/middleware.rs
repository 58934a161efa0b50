use super::{error::AuthError, types::AuthenticatedUser};
use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::shared::state::AppState;
use crate::core::store::{EntityStore, StoreError};
use crate::directory::User;
use crate::security::jwt::{extract_bearer_token, TokenError};

/// Verifies the bearer token and stores the caller in request extensions.
///
/// Anonymous paths pass through untouched; every other request without a
/// valid, unexpired token is answered with 401 before reaching a handler.
/// The account is re-read on every request, so a deleted or deactivated
/// user loses access at once and role changes apply without a new token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if state.auth_config.is_anonymous_allowed(&path) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or(AuthError::MissingToken)?;

    let claims = state.jwt.validate(token).map_err(|e| {
        info!("Rejected token for {} {}: {}", request.method(), path, e);
        match e {
            TokenError::Expired => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        }
    })?;

    let user_id = claims.user_id().map_err(|_| AuthError::InvalidToken)?;
    let account = match EntityStore::<User>::get(state.store.as_ref(), user_id).await {
        Ok(account) => account,
        Err(StoreError::NotFound(_)) => {
            info!("Token for unknown user {} on {}", user_id, path);
            return Err(AuthError::UserNotFound);
        }
        Err(e) => return Err(AuthError::InternalError(e.to_string())),
    };
    if !account.is_active {
        info!("Token for inactive user {} on {}", account.username, path);
        return Err(AuthError::InvalidToken);
    }
    let user = AuthenticatedUser::new(account.id, account.username, account.role);

    debug!("Authenticated {} ({}) for {}", user.username, user.role, path);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

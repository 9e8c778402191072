use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use tether_auth::token;
use tether_db::Database;
use tether_db::models::{UserRow, parse_timestamp};
use tether_types::api::RefreshResponse;

use crate::auth::AppState;
use crate::error::{ApiError, UNAUTHORIZED_MSG};
use crate::middleware::bearer_token;

/// Why a refresh token failed to resolve to its user. At the HTTP
/// boundary these all become 401.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token has been revoked")]
    Revoked,
    #[error("refresh token has expired")]
    Expired,
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

/// Resolve a refresh token to its owning user. Revoked and expired tokens
/// are rejected here, never silently accepted.
pub fn resolve_user(db: &Database, token: &str) -> Result<UserRow, ResolveError> {
    let row = db.get_refresh_token(token)?.ok_or(ResolveError::NotFound)?;

    if row.revoked_at.is_some() {
        return Err(ResolveError::Revoked);
    }
    if Utc::now() >= parse_timestamp(&row.expires_at) {
        return Err(ResolveError::Expired);
    }

    db.get_user_by_refresh_token(&row.token)?
        .ok_or(ResolveError::NotFound)
}

/// POST /v1/refresh-token — the bearer token here is the opaque refresh
/// token, not a JWT.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refresh_token = bearer_token(&headers).ok_or(ApiError::Unauthorized(UNAUTHORIZED_MSG))?;

    let user = match resolve_user(&state.db, refresh_token) {
        Ok(user) => user,
        Err(ResolveError::Db(e)) => return Err(ApiError::Internal(e)),
        Err(_) => return Err(ApiError::Unauthorized(UNAUTHORIZED_MSG)),
    };

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let access_token =
        token::issue_token(user_id, &user.username, &state.jwt_secret, Duration::hours(1))?;

    Ok(Json(RefreshResponse { access_token }))
}

/// DELETE /v1/refresh-token — revocation is idempotent; only an unknown
/// token is rejected.
pub async fn revoke_refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let refresh_token = bearer_token(&headers).ok_or(ApiError::Unauthorized(UNAUTHORIZED_MSG))?;

    if !state.db.revoke_refresh_token(refresh_token)? {
        return Err(ApiError::Unauthorized(UNAUTHORIZED_MSG));
    }

    Ok(StatusCode::NO_CONTENT)
}

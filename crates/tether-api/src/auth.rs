use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use uuid::Uuid;

use tether_auth::{password, token};
use tether_db::Database;
use tether_db::models::parse_timestamp;
use tether_types::api::{LoginRequest, LoginResponse};

use crate::error::{ApiError, BAD_CREDENTIALS_MSG};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Refresh tokens outlive access tokens by design: access tokens are
/// re-minted from them for sixty days.
const REFRESH_TOKEN_DAYS: i64 = 60;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS_MSG))?;

    if !password::verify_password(&req.password, &user.password)? {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS_MSG));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let access_token = token::issue_token(user_id, &user.username, &state.jwt_secret, Duration::hours(1))?;

    let refresh_token = token::generate_refresh_token()?;
    let expires_at = (Utc::now() + Duration::days(REFRESH_TOKEN_DAYS)).to_rfc3339();
    state
        .db
        .create_refresh_token(&refresh_token, &user.id, &expires_at)?;

    Ok(Json(LoginResponse {
        id: user_id,
        username: user.username,
        email: user.email,
        created_at: parse_timestamp(&user.created_at),
        updated_at: parse_timestamp(&user.updated_at),
        access_token,
        refresh_token,
    }))
}

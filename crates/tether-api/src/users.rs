use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use uuid::Uuid;

use tether_auth::password;
use tether_db::models::parse_timestamp;
use tether_types::api::{
    Claims, CreateUserRequest, CreateUserResponse, UpdateAvatarRequest, UserProfileResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be between 3 and 32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("invalid email address".into()));
    }

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Conflict("username is already taken".into()));
    }

    let password_hash = password::hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    // User and preference rows are created in one transaction.
    state
        .db
        .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash)?;

    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(|| anyhow::anyhow!("user '{}' vanished after insert", req.username))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user_id,
            username: user.username,
            email: user.email,
            created_at: parse_timestamp(&user.created_at),
            updated_at: parse_timestamp(&user.updated_at),
        }),
    ))
}

/// An absent user is not a 404: the response keeps a 200 shape with
/// `exists: false` so profile pages can render a "no such user" state.
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let Some(profile) = state.db.get_user_profile(&username)? else {
        return Ok(Json(UserProfileResponse::default()));
    };

    let id: Uuid = profile
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", profile.id, e))?;

    Ok(Json(UserProfileResponse {
        id: Some(id),
        username: Some(profile.username),
        email: Some(profile.email),
        created_at: Some(parse_timestamp(&profile.created_at)),
        updated_at: Some(parse_timestamp(&profile.updated_at)),
        avatar_url: profile.avatar_url,
        cover_url: profile.cover_url,
        dark_mode: profile.dark_mode,
        private_mode: profile.private_mode,
        followers: profile.followers,
        following: profile.following,
        exists: true,
    }))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.avatar_url.is_empty() {
        return Err(ApiError::Validation("avatar_url must not be empty".into()));
    }

    state
        .db
        .set_avatar_url(&claims.sub.to_string(), &req.avatar_url)?;

    Ok(Json(json!({})))
}

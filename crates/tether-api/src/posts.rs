use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use tether_db::models::{PostRow, parse_timestamp};
use tether_types::api::{Claims, CreatePostRequest, PostResponse};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::Validation("post body must not be empty".into()));
    }

    let post_id = Uuid::new_v4();
    state
        .db
        .create_post(&post_id.to_string(), &claims.sub.to_string(), &req.body)?;

    Ok((StatusCode::CREATED, Json(json!({}))))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let rows = state.db.get_posts_by_username(&username)?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

pub async fn get_all_posts(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let rows = state.db.get_all_posts()?;
    Ok(Json(rows.into_iter().map(to_response).collect()))
}

fn to_response(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt post id '{}': {}", row.id, e);
            Uuid::default()
        }),
        body: row.body,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt author id '{}' on post '{}': {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        username: row.username,
        avatar_url: row.avatar_url,
    }
}

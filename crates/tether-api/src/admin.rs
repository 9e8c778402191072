use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /v1/reset — bulk wipe for admin/testing use.
pub async fn reset(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.db.reset_all_tables()?;

    info!("all tables reset");
    Ok(Json(json!({
        "message": "reset tables: users, user_preferences, refresh_tokens, posts, friendships"
    })))
}

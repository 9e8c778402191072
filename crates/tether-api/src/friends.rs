use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use tether_db::models::parse_timestamp;
use tether_types::api::{Claims, FriendResponse, UserSummary};
use tether_types::models::{FriendshipStatus, normalize_pair};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn add_friend(
    State(state): State<AppState>,
    Path((username, friend_username)): Path<(String, String)>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::Validation(format!("no such user: {username}")))?;
    let friend = state
        .db
        .get_user_by_username(&friend_username)?
        .ok_or_else(|| ApiError::Validation(format!("no such user: {friend_username}")))?;

    if user.id == friend.id {
        return Err(ApiError::Validation(
            "cannot send a friend request to yourself".into(),
        ));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;
    let friend_id: Uuid = friend
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", friend.id, e))?;

    // Rows are keyed on the normalized pair; the requester survives only
    // in the initiator column.
    let (low, high) = normalize_pair(user_id, friend_id);
    let created = state
        .db
        .create_friendship(&low.to_string(), &high.to_string(), &user.id)?;
    if !created {
        return Err(ApiError::Conflict("friend request already exists".into()));
    }

    Ok(Json(json!({ "message": "Friend request sent" })))
}

pub async fn get_friends_list(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<FriendResponse>>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::Validation(format!("no such user: {username}")))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let rows = state.db.list_friendships_for_user(&user.id)?;

    let friends = rows
        .into_iter()
        .map(|row| {
            // Storage order is canonical, not request order: the peer is
            // whichever stored id is not the caller's.
            let peer_id = if row.user_low_id == user.id {
                &row.user_high_id
            } else {
                &row.user_low_id
            };

            FriendResponse {
                user_id,
                friend_id: peer_id.parse().unwrap_or_else(|e| {
                    warn!("Corrupt friend id '{}': {}", peer_id, e);
                    Uuid::default()
                }),
                status: FriendshipStatus::parse(&row.status).unwrap_or_else(|| {
                    warn!("Corrupt friendship status '{}'", row.status);
                    FriendshipStatus::Pending
                }),
                initiator_id: row.initiator_id.parse().unwrap_or_else(|e| {
                    warn!("Corrupt initiator id '{}': {}", row.initiator_id, e);
                    Uuid::default()
                }),
                created_at: parse_timestamp(&row.created_at),
                updated_at: parse_timestamp(&row.updated_at),
                friend_username: row.friend_username,
                friend_avatar_url: row.friend_avatar_url,
            }
        })
        .collect();

    Ok(Json(friends))
}

pub async fn get_non_friends(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::Validation(format!("no such user: {username}")))?;

    let rows = state.db.list_non_friend_users(&user.id)?;

    let users = rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", row.id, e);
                Uuid::default()
            }),
            username: row.username,
            email: row.email,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
            avatar_url: row.avatar_url,
        })
        .collect();

    Ok(Json(users))
}

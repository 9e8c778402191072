//! Database row types — these map directly to SQLite rows.
//! Distinct from the tether-types API models to keep the DB layer
//! independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct UserProfileRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
    pub avatar_url: Option<String>,
    pub cover_url: Option<String>,
    pub dark_mode: bool,
    pub private_mode: bool,
    pub followers: i64,
    pub following: i64,
}

pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
    pub avatar_url: Option<String>,
}

pub struct RefreshTokenRow {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
    pub revoked_at: Option<String>,
}

pub struct FriendshipRow {
    pub user_low_id: String,
    pub user_high_id: String,
    pub status: String,
    pub initiator_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A friendship row joined with the peer's username and avatar.
pub struct FriendRow {
    pub user_low_id: String,
    pub user_high_id: String,
    pub status: String,
    pub initiator_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub friend_username: String,
    pub friend_avatar_url: Option<String>,
}

pub struct PostRow {
    pub id: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    pub user_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Parse a stored timestamp. Values written by Rust are RFC 3339; columns
/// filled by the SQLite `datetime('now')` default are naive
/// "YYYY-MM-DD HH:MM:SS" UTC. Corrupt values fall back to the epoch.
pub fn parse_timestamp(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", s, e);
            DateTime::default()
        })
}

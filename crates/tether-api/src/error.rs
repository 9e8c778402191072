use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use tether_auth::password::HashError;
use tether_auth::token::{RandomnessError, TokenError};

/// Boundary error for every handler. Each variant carries the message the
/// client sees; internal causes are logged server-side and replaced with a
/// fixed generic body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const UNAUTHORIZED_MSG: &str = "Unauthorized: missing or invalid token";
pub const BAD_CREDENTIALS_MSG: &str = "Invalid username or password";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<HashError> for ApiError {
    fn from(e: HashError) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}

impl From<RandomnessError> for ApiError {
    fn from(e: RandomnessError) -> Self {
        ApiError::Internal(anyhow::Error::new(e))
    }
}

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use tether_auth::token::verify_token;

use crate::auth::AppState;
use crate::error::{ApiError, UNAUTHORIZED_MSG};

/// Extract a bearer token from the Authorization header. The scheme must
/// be exactly "Bearer " and the remainder non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    (!token.is_empty()).then_some(token)
}

/// Extract and validate a JWT from the Authorization header, then expose
/// the claims to handlers through request extensions.
///
/// Expired, malformed and badly-signed tokens all collapse into the same
/// 401; callers never learn which check failed.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized(UNAUTHORIZED_MSG))?;

    let claims = verify_token(token, &state.jwt_secret)
        .map_err(|_| ApiError::Unauthorized(UNAUTHORIZED_MSG))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token_after_bearer_prefix() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn wrong_scheme_yields_none() {
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("bearer abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearerabc")), None);
    }

    #[test]
    fn empty_remainder_yields_none() {
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
    }
}

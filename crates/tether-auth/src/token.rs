use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand_core::{OsRng, RngCore};
use thiserror::Error;
use uuid::Uuid;

use tether_types::api::Claims;

/// Issuer embedded in every access token. Unchecked on verification for
/// now; carried for forward compatibility with multiple issuers.
pub const ISSUER: &str = "tether";

/// Refresh tokens are 32 bytes of OS entropy, hex-encoded.
const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("couldn't sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
#[error("entropy source failed: {0}")]
pub struct RandomnessError(rand_core::Error);

/// Sign a short-lived access token carrying identity claims.
pub fn issue_token(
    user_id: Uuid,
    username: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        iss: ISSUER.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Verify an access token and return its claims.
///
/// Only HMAC-SHA256 is accepted; a token signed with any other algorithm
/// or key fails with `InvalidSignature`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(e) => Err(match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }),
    }
}

/// Generate an opaque refresh token from the OS entropy source.
pub fn generate_refresh_token() -> Result<String, RandomnessError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(RandomnessError)?;
    Ok(hex::encode(bytes))
}

//! JWT issuance and validation (HS256).
//!
//! Tokens are stateless: logout is the client discarding its pair. The
//! subject claim is the user's public id, never the internal key.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;
use uuid::Uuid;

use crate::config::AppSettings;
use crate::error::ApiError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's public id
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

fn now_secs() -> Result<u64, ApiError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| {
            error!("failed to read system time: {}", e);
            ApiError::Internal
        })
}

/// Issue a single token of the given type for `sub`.
pub fn issue_token(
    settings: &AppSettings,
    sub: Uuid,
    token_type: TokenType,
) -> Result<String, ApiError> {
    let now = now_secs()?;
    let expiry = match token_type {
        TokenType::Access => settings.access_token_expiry,
        TokenType::Refresh => settings.refresh_token_expiry,
    };

    let claims = Claims {
        sub,
        iat: now,
        exp: now + expiry,
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("failed to encode token: {}", e);
        ApiError::Internal
    })
}

/// Issue the (access, refresh) pair handed out by register and login.
pub fn issue_token_pair(settings: &AppSettings, sub: Uuid) -> Result<(String, String), ApiError> {
    let access = issue_token(settings, sub, TokenType::Access)?;
    let refresh = issue_token(settings, sub, TokenType::Refresh)?;
    Ok((access, refresh))
}

/// Decode and validate a token, checking it is of the expected type.
///
/// Any failure (bad signature, expired, wrong type) is `Unauthenticated`;
/// the caller should not be able to tell why a token was rejected.
pub fn decode_token(
    settings: &AppSettings,
    token: &str,
    expected: TokenType,
) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    if data.claims.token_type != expected {
        return Err(ApiError::Unauthenticated);
    }

    Ok(data.claims)
}

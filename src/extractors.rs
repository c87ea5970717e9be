//! Request extractors resolving the acting user from Bearer credentials.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use model::entities::user;

use crate::auth::jwt::{decode_token, TokenType};
use crate::error::ApiError;
use crate::schemas::AppState;

/// The authenticated actor behind the current request.
///
/// Extraction fails with `Unauthenticated` when no Bearer token is
/// presented, when the token fails validation, or when it resolves to no
/// active user. Whether the actor is *allowed* to do something is a
/// separate, later decision (see `permissions`).
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let claims = decode_token(&state.settings, token, TokenType::Access)?;

        let user = user::Entity::find()
            .filter(user::Column::PublicId.eq(claims.sub))
            .one(&state.db)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        if !user.is_active {
            return Err(ApiError::Unauthenticated);
        }

        Ok(CurrentUser(user))
    }
}

/// Optional actor: yields `None` instead of a 401 when no valid
/// credentials are presented. Used by the safe read endpoints that serve
/// anonymous and authenticated viewers alike.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(user)) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

/// Origin of the current request (`scheme://host`), consumed by the
/// representation layer when debug mode rewrites avatar references to
/// absolute URLs.
#[derive(Debug, Clone)]
pub struct RequestOrigin(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok());

        Ok(RequestOrigin(host.map(|host| format!("http://{}", host))))
    }
}

//! Lookup of entities by their externally visible identifier.
//!
//! A malformed identifier and a missing record are different failures:
//! the first never touches the store and maps to 400, the second maps to
//! 404. Both are client errors.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use model::entities::{comment, post, user};

use crate::error::ApiError;

/// Parse a path segment as a public identifier.
pub fn parse_public_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::MalformedIdentifier(raw.to_string()))
}

/// Find a user by public id.
pub async fn find_user<C: ConnectionTrait>(db: &C, public_id: Uuid) -> Result<user::Model, ApiError> {
    user::Entity::find()
        .filter(user::Column::PublicId.eq(public_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("there is no user with public id \"{}\"", public_id)))
}

/// Find a post by public id.
pub async fn find_post<C: ConnectionTrait>(db: &C, public_id: Uuid) -> Result<post::Model, ApiError> {
    post::Entity::find()
        .filter(post::Column::PublicId.eq(public_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("there is no post with public id \"{}\"", public_id)))
}

/// Find a comment by public id.
pub async fn find_comment<C: ConnectionTrait>(
    db: &C,
    public_id: Uuid,
) -> Result<comment::Model, ApiError> {
    comment::Entity::find()
        .filter(comment::Column::PublicId.eq(public_id))
        .one(db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("there is no comment with public id \"{}\"", public_id))
        })
}

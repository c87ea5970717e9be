//! Set operations over the like-edge join tables.
//!
//! Likes are modeled as an ownership-free association between users and
//! posts/comments. Adding an edge that already exists and removing an edge
//! that never existed are both no-ops that succeed, so every operation here
//! is safe to retry. Duplicate suppression happens inside the database via
//! the composite primary key, which keeps the set invariant intact under
//! concurrent requests.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::entities::{comment_like, post_like};

/// Add a like edge from `user_id` to `post_id`.
///
/// Returns `true` if a new edge was inserted, `false` if the post was
/// already liked by this user.
pub async fn like_post<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
) -> Result<bool, DbErr> {
    let edge = post_like::ActiveModel {
        user_id: Set(user_id),
        post_id: Set(post_id),
    };
    let on_conflict = OnConflict::columns([post_like::Column::UserId, post_like::Column::PostId])
        .do_nothing()
        .to_owned();

    match post_like::Entity::insert(edge).on_conflict(on_conflict).exec(db).await {
        Ok(_) => Ok(true),
        // The edge already existed; the liked-by set is unchanged.
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove the like edge from `user_id` to `post_id`.
///
/// Returns `true` if an edge was removed, `false` if there was none.
pub async fn unlike_post<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
) -> Result<bool, DbErr> {
    let result = post_like::Entity::delete_many()
        .filter(post_like::Column::UserId.eq(user_id))
        .filter(post_like::Column::PostId.eq(post_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Whether `user_id` currently likes `post_id`.
pub async fn has_liked_post<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
) -> Result<bool, DbErr> {
    let count = post_like::Entity::find()
        .filter(post_like::Column::UserId.eq(user_id))
        .filter(post_like::Column::PostId.eq(post_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Current cardinality of the post's liked-by set.
pub async fn post_like_count<C: ConnectionTrait>(db: &C, post_id: i32) -> Result<u64, DbErr> {
    post_like::Entity::find()
        .filter(post_like::Column::PostId.eq(post_id))
        .count(db)
        .await
}

/// Add a like edge from `user_id` to `comment_id`.
pub async fn like_comment<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    comment_id: i32,
) -> Result<bool, DbErr> {
    let edge = comment_like::ActiveModel {
        user_id: Set(user_id),
        comment_id: Set(comment_id),
    };
    let on_conflict = OnConflict::columns([
        comment_like::Column::UserId,
        comment_like::Column::CommentId,
    ])
    .do_nothing()
    .to_owned();

    match comment_like::Entity::insert(edge).on_conflict(on_conflict).exec(db).await {
        Ok(_) => Ok(true),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove the like edge from `user_id` to `comment_id`.
pub async fn unlike_comment<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    comment_id: i32,
) -> Result<bool, DbErr> {
    let result = comment_like::Entity::delete_many()
        .filter(comment_like::Column::UserId.eq(user_id))
        .filter(comment_like::Column::CommentId.eq(comment_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Whether `user_id` currently likes `comment_id`.
pub async fn has_liked_comment<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    comment_id: i32,
) -> Result<bool, DbErr> {
    let count = comment_like::Entity::find()
        .filter(comment_like::Column::UserId.eq(user_id))
        .filter(comment_like::Column::CommentId.eq(comment_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Current cardinality of the comment's liked-by set.
pub async fn comment_like_count<C: ConnectionTrait>(
    db: &C,
    comment_id: i32,
) -> Result<u64, DbErr> {
    comment_like::Entity::find()
        .filter(comment_like::Column::CommentId.eq(comment_id))
        .count(db)
        .await
}

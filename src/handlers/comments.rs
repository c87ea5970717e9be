use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use model::entities::{comment, post, user};
use model::likes;

use crate::cache::{self, Collection};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{CurrentUser, MaybeUser, RequestOrigin};
use crate::handlers::users::{render_user, UserResponse};
use crate::lookup::{find_comment, find_post, parse_public_id};
use crate::permissions;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};

/// Request body for creating a comment under a post
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCommentRequest {
    /// Author public id; must be the authenticated actor
    pub author: String,
    #[validate(length(min = 1))]
    pub body: String,
}

/// Request body for updating a comment. Only the body is mutable; the
/// author and the parent post are preserved no matter what the payload
/// carries.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    pub body: String,
}

/// Comment response model
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentResponse {
    /// Public identifier
    pub id: Uuid,
    /// Public id of the parent post
    pub post: Uuid,
    /// Fully rendered author payload
    pub author: UserResponse,
    pub body: String,
    /// Whether the body has ever been changed since creation
    pub edited: bool,
    /// Whether the viewing actor likes this comment (false for anonymous)
    pub liked: bool,
    pub likes_count: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Resolve the representation of `comment` for `viewer`.
pub async fn render_comment(
    state: &AppState,
    post: &post::Model,
    comment: &comment::Model,
    viewer: Option<&user::Model>,
    origin: Option<&str>,
) -> Result<CommentResponse, ApiError> {
    let author = user::Entity::find_by_id(comment.author_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::Database(DbErr::RecordNotFound(format!(
                "author of comment {} is missing",
                comment.public_id
            )))
        })?;

    let liked = match viewer {
        Some(viewer) => likes::has_liked_comment(&state.db, viewer.id, comment.id).await?,
        None => false,
    };
    let likes_count = likes::comment_like_count(&state.db, comment.id).await?;

    Ok(CommentResponse {
        id: comment.public_id,
        post: post.public_id,
        author: render_user(state, &author, origin).await?,
        body: comment.body.clone(),
        edited: comment.edited,
        liked,
        likes_count,
        created: comment.created.with_timezone(&Utc),
        updated: comment.updated.with_timezone(&Utc),
    })
}

/// Resolve the (post, comment) pair addressed by a nested route,
/// rejecting comments that do not belong to the addressed post.
async fn find_post_and_comment(
    state: &AppState,
    post_id: &str,
    comment_id: &str,
) -> Result<(post::Model, comment::Model), ApiError> {
    let post_public_id = parse_public_id(post_id)?;
    let comment_public_id = parse_public_id(comment_id)?;

    let post = find_post(&state.db, post_public_id).await?;
    let comment = find_comment(&state.db, comment_public_id).await?;
    if comment.post_id != post.id {
        return Err(ApiError::NotFound(format!(
            "there is no comment with public id \"{}\" under this post",
            comment_public_id
        )));
    }

    Ok((post, comment))
}

/// List the comments under a post, most recently updated first
#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}/comments",
    tag = "comments",
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    responses(
        (status = 200, description = "Comments retrieved successfully", body = ApiResponse<Vec<CommentResponse>>),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn list_comments(
    MaybeUser(viewer): MaybeUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<CommentResponse>>>> {
    trace!("Entering list_comments function");

    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    let cache_key =
        cache::comment_list_key(viewer.as_ref().map(|v| v.public_id), post.public_id);
    if let Some(CachedData::Comments(comments)) = state.cache.get(&cache_key).await {
        debug!("Comment list served from cache");
        return Ok(Json(ApiResponse {
            data: comments,
            message: "Comments retrieved successfully".to_string(),
            success: true,
        }));
    }

    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post.id))
        .order_by_desc(comment::Column::Updated)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} comments from database", comments.len());

    let mut responses = Vec::with_capacity(comments.len());
    for comment in &comments {
        responses
            .push(render_comment(&state, &post, comment, viewer.as_ref(), origin.0.as_deref()).await?);
    }

    state
        .cache
        .insert(cache_key, CachedData::Comments(responses.clone()))
        .await;

    info!("Successfully retrieved {} comments", responses.len());
    Ok(Json(ApiResponse {
        data: responses,
        message: "Comments retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a comment under a post, authored by the current actor
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/comments",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created successfully", body = ApiResponse<CommentResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn create_comment(
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CommentResponse>>)> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let author_public_id = parse_public_id(&request.author)?;
    if author_public_id != actor.public_id {
        return Err(ApiError::Validation(
            "You can't create a comment for another user.".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let new_comment = comment::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        post_id: Set(post.id),
        author_id: Set(actor.id),
        body: Set(request.body),
        edited: Set(false),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    };

    let comment = new_comment.insert(&state.db).await?;
    // Post payloads embed the comment count, so both collections are stale.
    cache::invalidate(&state.cache, Collection::Comments)?;
    cache::invalidate(&state.cache, Collection::Posts)?;

    info!(
        "Comment {} created on post {} by {}",
        comment.public_id, post.public_id, actor.public_id
    );
    let data = render_comment(&state, &post, &comment, Some(&actor), origin.0.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            message: "Comment created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get a specific comment
#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("post_id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id"),
    ),
    responses(
        (status = 200, description = "Comment retrieved successfully", body = ApiResponse<CommentResponse>),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Post or comment not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id, comment_id = %comment_id))]
pub async fn get_comment(
    MaybeUser(viewer): MaybeUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CommentResponse>>> {
    let (post, comment) = find_post_and_comment(&state, &post_id, &comment_id).await?;

    let data = render_comment(&state, &post, &comment, viewer.as_ref(), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Comment retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a comment's body
#[utoipa::path(
    put,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id"),
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated successfully", body = ApiResponse<CommentResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the author or a superuser", body = ErrorResponse),
        (status = 404, description = "Post or comment not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id, comment_id = %comment_id))]
pub async fn update_comment(
    CurrentUser(actor): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<Json<ApiResponse<CommentResponse>>> {
    let (post, comment) = find_post_and_comment(&state, &post_id, &comment_id).await?;

    permissions::can_modify_comment(&actor, &comment).require()?;

    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let body_changed = request.body != comment.body;

    let mut active: comment::ActiveModel = comment.into();
    active.body = Set(request.body);
    if body_changed {
        active.edited = Set(true);
    }
    active.updated = Set(Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    cache::invalidate(&state.cache, Collection::Comments)?;

    info!("Comment {} updated by {}", updated.public_id, actor.public_id);
    let data = render_comment(&state, &post, &updated, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Comment updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a comment
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id"),
    ),
    responses(
        (status = 200, description = "Comment deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not allowed to delete this comment", body = ErrorResponse),
        (status = 404, description = "Post or comment not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id, comment_id = %comment_id))]
pub async fn delete_comment(
    CurrentUser(actor): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let (post, comment) = find_post_and_comment(&state, &post_id, &comment_id).await?;

    permissions::can_delete_comment(&actor, &comment, post.author_id).require()?;

    let comment_public_id = comment.public_id;
    comment::Entity::delete_by_id(comment.id)
        .exec(&state.db)
        .await?;
    cache::invalidate(&state.cache, Collection::Comments)?;
    cache::invalidate(&state.cache, Collection::Posts)?;

    info!(
        "Comment {} deleted by {}",
        comment_public_id, actor.public_id
    );
    Ok(Json(ApiResponse {
        data: format!("Comment {} deleted", comment_public_id),
        message: "Comment deleted successfully".to_string(),
        success: true,
    }))
}

/// Like a comment as the current actor
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}/like",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id"),
    ),
    responses(
        (status = 200, description = "Comment liked", body = ApiResponse<CommentResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Post or comment not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id, comment_id = %comment_id))]
pub async fn like_comment(
    CurrentUser(actor): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CommentResponse>>> {
    let (post, comment) = find_post_and_comment(&state, &post_id, &comment_id).await?;

    let inserted = likes::like_comment(&state.db, actor.id, comment.id).await?;
    if inserted {
        debug!("{} liked comment {}", actor.public_id, comment.public_id);
    }
    cache::invalidate(&state.cache, Collection::Comments)?;

    let data = render_comment(&state, &post, &comment, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Comment liked successfully".to_string(),
        success: true,
    }))
}

/// Remove the current actor's like from a comment
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}/comments/{comment_id}/like",
    tag = "comments",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
        ("comment_id" = String, Path, description = "Comment public id"),
    ),
    responses(
        (status = 200, description = "Like removed", body = ApiResponse<CommentResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Post or comment not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id, comment_id = %comment_id))]
pub async fn unlike_comment(
    CurrentUser(actor): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<CommentResponse>>> {
    let (post, comment) = find_post_and_comment(&state, &post_id, &comment_id).await?;

    likes::unlike_comment(&state.db, actor.id, comment.id).await?;
    cache::invalidate(&state.cache, Collection::Comments)?;

    let data = render_comment(&state, &post, &comment, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Comment unliked successfully".to_string(),
        success: true,
    }))
}

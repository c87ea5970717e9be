use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
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
use crate::lookup::{find_post, parse_public_id};
use crate::permissions;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse, PostListQuery};

/// Request body for creating a new post
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreatePostRequest {
    /// Author public id; must be the authenticated actor
    pub author: String,
    #[validate(length(min = 1))]
    pub body: String,
}

/// Request body for updating a post. Only the body is mutable; the
/// author is preserved no matter what the payload carries.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1))]
    pub body: String,
}

/// Post response model
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostResponse {
    /// Public identifier
    pub id: Uuid,
    /// Fully rendered author payload
    pub author: UserResponse,
    pub body: String,
    /// Whether the body has ever been changed since creation
    pub edited: bool,
    /// Whether the viewing actor likes this post (false for anonymous)
    pub liked: bool,
    pub likes_count: u64,
    pub comments_count: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Resolve the representation of `post` for `viewer`.
///
/// The author reference is resolved and rendered as a nested user
/// payload; `liked` and the counts are computed on demand.
pub async fn render_post(
    state: &AppState,
    post: &post::Model,
    viewer: Option<&user::Model>,
    origin: Option<&str>,
) -> Result<PostResponse, ApiError> {
    let author = user::Entity::find_by_id(post.author_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::Database(DbErr::RecordNotFound(format!(
                "author of post {} is missing",
                post.public_id
            )))
        })?;

    let liked = match viewer {
        Some(viewer) => likes::has_liked_post(&state.db, viewer.id, post.id).await?,
        None => false,
    };
    let likes_count = likes::post_like_count(&state.db, post.id).await?;
    let comments_count = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post.id))
        .count(&state.db)
        .await?;

    Ok(PostResponse {
        id: post.public_id,
        author: render_user(state, &author, origin).await?,
        body: post.body.clone(),
        edited: post.edited,
        liked,
        likes_count,
        comments_count,
        created: post.created.with_timezone(&Utc),
        updated: post.updated.with_timezone(&Utc),
    })
}

/// List posts, most recently updated first
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    responses(
        (status = 200, description = "Posts retrieved successfully", body = ApiResponse<Vec<PostResponse>>),
        (status = 400, description = "Malformed author filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn list_posts(
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<PostListQuery>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<PostResponse>>>> {
    trace!("Entering list_posts function");

    let author_filter = match &query.author_public_id {
        Some(raw) => Some(parse_public_id(raw)?),
        None => None,
    };

    let cache_key = cache::post_list_key(
        viewer.as_ref().map(|v| v.public_id),
        author_filter,
        query.limit,
        query.offset,
    );
    if let Some(CachedData::Posts(posts)) = state.cache.get(&cache_key).await {
        debug!("Post list served from cache");
        return Ok(Json(ApiResponse {
            data: posts,
            message: "Posts retrieved successfully".to_string(),
            success: true,
        }));
    }

    let mut select = post::Entity::find().order_by_desc(post::Column::Updated);
    if let Some(author_public_id) = author_filter {
        // An unknown author yields an empty page, same as a filter with
        // no matches.
        match user::Entity::find()
            .filter(user::Column::PublicId.eq(author_public_id))
            .one(&state.db)
            .await?
        {
            Some(author) => select = select.filter(post::Column::AuthorId.eq(author.id)),
            None => {
                return Ok(Json(ApiResponse {
                    data: vec![],
                    message: "Posts retrieved successfully".to_string(),
                    success: true,
                }));
            }
        }
    }
    if let Some(limit) = query.limit {
        select = select.limit(limit);
    }
    if let Some(offset) = query.offset {
        select = select.offset(offset);
    }

    let posts = select.all(&state.db).await?;
    debug!("Retrieved {} posts from database", posts.len());

    let mut responses = Vec::with_capacity(posts.len());
    for post in &posts {
        responses.push(render_post(&state, post, viewer.as_ref(), origin.0.as_deref()).await?);
    }

    state
        .cache
        .insert(cache_key, CachedData::Posts(responses.clone()))
        .await;

    info!("Successfully retrieved {} posts", responses.len());
    Ok(Json(ApiResponse {
        data: responses,
        message: "Posts retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a new post authored by the current actor
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    security(("bearer_auth" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created successfully", body = ApiResponse<PostResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn create_post(
    CurrentUser(actor): CurrentUser,
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<PostResponse>>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let author_public_id = parse_public_id(&request.author)?;
    if author_public_id != actor.public_id {
        return Err(ApiError::Validation(
            "You can't create a post for another user.".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let new_post = post::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        author_id: Set(actor.id),
        body: Set(request.body),
        edited: Set(false),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    };

    let post = new_post.insert(&state.db).await?;
    cache::invalidate(&state.cache, Collection::Posts)?;

    info!("Post {} created by {}", post.public_id, actor.public_id);
    let data = render_post(&state, &post, Some(&actor), origin.0.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            message: "Post created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get a specific post by public id
#[utoipa::path(
    get,
    path = "/api/v1/posts/{post_id}",
    tag = "posts",
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    responses(
        (status = 200, description = "Post retrieved successfully", body = ApiResponse<PostResponse>),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn get_post(
    MaybeUser(viewer): MaybeUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<PostResponse>>> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    let data = render_post(&state, &post, viewer.as_ref(), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Post retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a post's body
#[utoipa::path(
    put,
    path = "/api/v1/posts/{post_id}",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated successfully", body = ApiResponse<PostResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the author or a superuser", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn update_post(
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<Json<ApiResponse<PostResponse>>> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    permissions::can_modify_post(&actor, &post).require()?;

    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let body_changed = request.body != post.body;

    let mut active: post::ActiveModel = post.into();
    active.body = Set(request.body);
    if body_changed {
        // Sticky: the flag is set together with the body change and
        // never cleared afterwards.
        active.edited = Set(true);
    }
    active.updated = Set(Utc::now().fixed_offset());

    let updated = active.update(&state.db).await?;
    cache::invalidate(&state.cache, Collection::Posts)?;

    info!("Post {} updated by {}", updated.public_id, actor.public_id);
    let data = render_post(&state, &updated, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Post updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    responses(
        (status = 200, description = "Post deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the author or a superuser", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn delete_post(
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    permissions::can_modify_post(&actor, &post).require()?;

    post::Entity::delete_by_id(post.id).exec(&state.db).await?;
    // Comments cascade away with the post, so both collections are stale.
    cache::invalidate(&state.cache, Collection::Posts)?;
    cache::invalidate(&state.cache, Collection::Comments)?;

    info!("Post {} deleted by {}", public_id, actor.public_id);
    Ok(Json(ApiResponse {
        data: format!("Post {} deleted", public_id),
        message: "Post deleted successfully".to_string(),
        success: true,
    }))
}

/// Like a post as the current actor
#[utoipa::path(
    post,
    path = "/api/v1/posts/{post_id}/like",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    responses(
        (status = 200, description = "Post liked", body = ApiResponse<PostResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn like_post(
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<PostResponse>>> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    let inserted = likes::like_post(&state.db, actor.id, post.id).await?;
    if inserted {
        debug!("{} liked post {}", actor.public_id, post.public_id);
    }
    cache::invalidate(&state.cache, Collection::Posts)?;

    let data = render_post(&state, &post, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Post liked successfully".to_string(),
        success: true,
    }))
}

/// Remove the current actor's like from a post
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{post_id}/like",
    tag = "posts",
    security(("bearer_auth" = [])),
    params(
        ("post_id" = String, Path, description = "Post public id"),
    ),
    responses(
        (status = 200, description = "Like removed", body = ApiResponse<PostResponse>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(post_id = %post_id))]
pub async fn unlike_post(
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<PostResponse>>> {
    let public_id = parse_public_id(&post_id)?;
    let post = find_post(&state.db, public_id).await?;

    likes::unlike_post(&state.db, actor.id, post.id).await?;
    cache::invalidate(&state.cache, Collection::Posts)?;

    let data = render_post(&state, &post, Some(&actor), origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "Post unliked successfully".to_string(),
        success: true,
    }))
}

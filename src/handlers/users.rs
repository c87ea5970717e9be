use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use model::entities::{post, user};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{CurrentUser, RequestOrigin};
use crate::lookup::{find_user, parse_public_id};
use crate::permissions;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, PageQuery};

/// Request body for updating a user profile. Absent fields keep their
/// stored values; `is_active`, the superuser flags and the public id are
/// not settable through the API.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 255))]
    pub username: Option<String>,
    /// Email address (must be unique)
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    /// Avatar reference (URL or media path)
    pub avatar: Option<String>,
}

/// User response model. This is also the nested author payload embedded
/// in post and comment responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// Public identifier
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Computed display name
    pub name: String,
    pub bio: String,
    /// Avatar reference; never empty, the configured default is
    /// substituted when the user has none
    pub avatar: String,
    pub email: String,
    pub is_active: bool,
    /// Number of posts authored by this user
    pub posts_count: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Resolve the representation of `user`.
///
/// Computes the authored-posts count, substitutes the configured default
/// avatar when none is set, and in debug mode rewrites relative avatar
/// references to absolute URLs using the request origin.
pub async fn render_user(
    state: &AppState,
    user: &user::Model,
    origin: Option<&str>,
) -> Result<UserResponse, ApiError> {
    let posts_count = post::Entity::find()
        .filter(post::Column::AuthorId.eq(user.id))
        .count(&state.db)
        .await?;

    let mut avatar = user
        .avatar
        .clone()
        .unwrap_or_else(|| state.settings.default_avatar.clone());

    if state.settings.debug {
        if let Some(origin) = origin {
            if avatar.starts_with('/') {
                avatar = format!("{}{}", origin, avatar);
            }
        }
    }

    Ok(UserResponse {
        id: user.public_id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        name: user.name(),
        bio: user.bio.clone(),
        avatar,
        email: user.email.clone(),
        is_active: user.is_active,
        posts_count,
        created: user.created.with_timezone(&Utc),
        updated: user.updated.with_timezone(&Utc),
    })
}

/// List all users, most recently updated first
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn list_users(
    CurrentUser(_actor): CurrentUser,
    Query(query): Query<PageQuery>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    trace!("Entering list_users function");

    let mut select = user::Entity::find().order_by_desc(user::Column::Updated);
    if let Some(limit) = query.limit {
        select = select.limit(limit);
    }
    if let Some(offset) = query.offset {
        select = select.offset(offset);
    }

    let users = select.all(&state.db).await?;
    debug!("Retrieved {} users from database", users.len());

    let mut responses = Vec::with_capacity(users.len());
    for user in &users {
        responses.push(render_user(&state, user, origin.0.as_deref()).await?);
    }

    info!("Successfully retrieved {} users", responses.len());
    Ok(Json(ApiResponse {
        data: responses,
        message: "Users retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a specific user by public id
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = String, Path, description = "User public id"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn get_user(
    CurrentUser(_actor): CurrentUser,
    Path(user_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let public_id = parse_public_id(&user_id)?;
    let user = find_user(&state.db, public_id).await?;

    let data = render_user(&state, &user, origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "User retrieved successfully".to_string(),
        success: true,
    }))
}

/// Partially update a user profile
#[utoipa::path(
    patch,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = String, Path, description = "User public id"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Not the user or a superuser", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn update_user(
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<String>,
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let public_id = parse_public_id(&user_id)?;
    let target = find_user(&state.db, public_id).await?;

    permissions::can_modify_user(&actor, &target).require()?;

    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut active: user::ActiveModel = target.into();
    if let Some(username) = request.username {
        active.username = Set(username);
    }
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    if let Some(first_name) = request.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = request.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(bio) = request.bio {
        active.bio = Set(bio);
    }
    if let Some(avatar) = request.avatar {
        active.avatar = Set(Some(avatar));
    }
    active.updated = Set(Utc::now().fixed_offset());

    let updated = active.update(&state.db).await.map_err(|e| {
        ApiError::from_db_unique(e, "a user with this email or username already exists")
    })?;
    info!("User {} updated successfully", updated.public_id);

    let data = render_user(&state, &updated, origin.0.as_deref()).await?;
    Ok(Json(ApiResponse {
        data,
        message: "User updated successfully".to_string(),
        success: true,
    }))
}

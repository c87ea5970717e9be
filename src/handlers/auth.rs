use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use model::entities::user;

use crate::auth::jwt::{decode_token, issue_token, issue_token_pair, TokenType};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extractors::RequestOrigin;
use crate::handlers::users::{render_user, UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Request body for user registration
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Email address (must be unique)
    #[validate(email)]
    pub email: String,
    /// Username (must be unique)
    #[validate(length(min = 3, max = 255))]
    pub username: String,
    /// Write-only credential, 8 to 128 characters
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
}

/// Request body for login
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for refreshing an access token
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Tokens plus the authenticated user's representation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub access: String,
    pub refresh: String,
}

/// A fresh access token
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new user and hand out a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Invalid registration data", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn register(
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SessionResponse>>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let password_hash = hash_password(&request.password)?;
    let now = Utc::now().fixed_offset();

    let new_user = user::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        username: Set(request.username.clone()),
        email: Set(request.email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(request.first_name),
        last_name: Set(request.last_name),
        bio: Set(request.bio),
        avatar: Set(None),
        is_active: Set(true),
        is_staff: Set(false),
        is_superuser: Set(false),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    };

    // Uniqueness of email/username is enforced by the schema; surface
    // constraint hits as validation failures.
    let user = new_user.insert(&state.db).await.map_err(|e| {
        warn!("registration insert failed: {}", e);
        ApiError::from_db_unique(e, "a user with this email or username already exists")
    })?;

    info!("User {} registered successfully", user.public_id);

    let (access, refresh) = issue_token_pair(&state.settings, user.public_id)?;
    let rendered = render_user(&state, &user, origin.0.as_deref()).await?;

    let response = ApiResponse {
        data: SessionResponse {
            user: rendered,
            access,
            refresh,
        },
        message: "User registered successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Verify credentials and hand out a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn login(
    origin: RequestOrigin,
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&request.password, &user.password_hash)? {
        warn!("failed login attempt for {}", user.public_id);
        return Err(ApiError::Unauthenticated);
    }
    if !user.is_active {
        return Err(ApiError::Unauthenticated);
    }

    info!("User {} logged in", user.public_id);

    let (access, refresh) = issue_token_pair(&state.settings, user.public_id)?;
    let rendered = render_user(&state, &user, origin.0.as_deref()).await?;

    Ok(Json(ApiResponse {
        data: SessionResponse {
            user: rendered,
            access,
            refresh,
        },
        message: "Login successful".to_string(),
        success: true,
    }))
}

/// Exchange a refresh token for a fresh access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Access token refreshed", body = ApiResponse<RefreshResponse>),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<RefreshResponse>>> {
    let claims = decode_token(&state.settings, &request.refresh, TokenType::Refresh)?;

    // The subject must still resolve to an active user.
    let user = user::Entity::find()
        .filter(user::Column::PublicId.eq(claims.sub))
        .one(&state.db)
        .await?
        .ok_or(ApiError::Unauthenticated)?;
    if !user.is_active {
        return Err(ApiError::Unauthenticated);
    }

    let access = issue_token(&state.settings, user.public_id, TokenType::Access)?;

    Ok(Json(ApiResponse {
        data: RefreshResponse { access },
        message: "Access token refreshed".to_string(),
        success: true,
    }))
}

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::config::AppSettings;
use crate::handlers::auth::{
    LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, SessionResponse,
};
use crate::handlers::comments::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};
use crate::handlers::posts::{CreatePostRequest, PostResponse, UpdatePostRequest};
use crate::handlers::users::{UpdateUserRequest, UserResponse};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for rendered collection payloads
    pub cache: Cache<String, CachedData>,
    /// Environment-driven settings
    pub settings: AppSettings,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Posts(Vec<PostResponse>),
    Comments(Vec<CommentResponse>),
}

/// Query parameters for paginated collection endpoints
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PageQuery {
    /// Maximum number of records to return
    pub limit: Option<u64>,
    /// Number of records to skip
    pub offset: Option<u64>,
}

/// Query parameters for the post list endpoint
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PostListQuery {
    /// Only return posts authored by this user (public id)
    pub author_public_id: Option<String>,
    /// Maximum number of records to return
    pub limit: Option<u64>,
    /// Number of records to skip
    pub offset: Option<u64>,
}

/// API response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Registers the Bearer JWT scheme referenced by the protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::posts::list_posts,
        crate::handlers::posts::create_post,
        crate::handlers::posts::get_post,
        crate::handlers::posts::update_post,
        crate::handlers::posts::delete_post,
        crate::handlers::posts::like_post,
        crate::handlers::posts::unlike_post,
        crate::handlers::comments::list_comments,
        crate::handlers::comments::create_comment,
        crate::handlers::comments::get_comment,
        crate::handlers::comments::update_comment,
        crate::handlers::comments::delete_comment,
        crate::handlers::comments::like_comment,
        crate::handlers::comments::unlike_comment,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
    ),
    components(
        schemas(
            ApiResponse<SessionResponse>,
            ApiResponse<RefreshResponse>,
            ApiResponse<PostResponse>,
            ApiResponse<Vec<PostResponse>>,
            ApiResponse<CommentResponse>,
            ApiResponse<Vec<CommentResponse>>,
            ApiResponse<UserResponse>,
            ApiResponse<Vec<UserResponse>>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            PageQuery,
            PostListQuery,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            SessionResponse,
            RefreshResponse,
            CreatePostRequest,
            UpdatePostRequest,
            PostResponse,
            CreateCommentRequest,
            UpdateCommentRequest,
            CommentResponse,
            UpdateUserRequest,
            UserResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and token endpoints"),
        (name = "posts", description = "Post CRUD and like endpoints"),
        (name = "comments", description = "Comment CRUD and like endpoints"),
        (name = "users", description = "User listing and profile endpoints"),
    ),
    info(
        title = "Postrust API",
        description = "Social posting API - users, posts, comments and likes",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

use crate::handlers::{
    auth::{login, refresh, register},
    comments::{
        create_comment, delete_comment, get_comment, like_comment, list_comments, unlike_comment,
        update_comment,
    },
    health::health_check,
    posts::{create_post, delete_post, get_post, like_post, list_posts, unlike_post, update_post},
    users::{get_user, list_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication routes
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        // Post CRUD routes
        .route("/api/v1/posts", get(list_posts))
        .route("/api/v1/posts", post(create_post))
        .route("/api/v1/posts/:post_id", get(get_post))
        .route("/api/v1/posts/:post_id", put(update_post))
        .route("/api/v1/posts/:post_id", delete(delete_post))
        // Post like routes
        .route("/api/v1/posts/:post_id/like", post(like_post))
        .route("/api/v1/posts/:post_id/like", delete(unlike_post))
        // Comment routes, nested under their post
        .route("/api/v1/posts/:post_id/comments", get(list_comments))
        .route("/api/v1/posts/:post_id/comments", post(create_comment))
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id",
            get(get_comment),
        )
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id",
            put(update_comment),
        )
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id",
            delete(delete_comment),
        )
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id/like",
            post(like_comment),
        )
        .route(
            "/api/v1/posts/:post_id/comments/:comment_id/like",
            delete(unlike_comment),
        )
        // User routes
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users/:user_id", get(get_user))
        .route("/api/v1/users/:user_id", patch(update_user))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Prometheus metrics are disabled in tests to avoid conflicts on the
    // global metrics recorder.
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

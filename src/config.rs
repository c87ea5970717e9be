use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;

use crate::schemas::AppState;

/// Environment-driven settings shared through [`AppState`].
#[derive(Clone, Debug)]
pub struct AppSettings {
    /// Secret used to sign and verify JWTs (HS256).
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expiry: u64,
    /// Avatar reference substituted when a user has none set.
    pub default_avatar: String,
    /// When true, relative avatar references are rewritten to absolute
    /// URLs using the request origin.
    pub debug: bool,
}

impl AppSettings {
    /// Load settings from the environment.
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HS256 signing secret
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: refresh token expiry in seconds (default: 604800)
    /// - `DEFAULT_AVATAR_URL`: avatar used for users without one
    /// - `APP_DEBUG`: enable debug-mode avatar URL rewriting
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, falling back to an insecure development secret");
            "insecure-dev-secret".to_string()
        });

        let access_token_expiry = env_u64("JWT_ACCESS_TOKEN_EXPIRY", 900); // 15 minutes
        let refresh_token_expiry = env_u64("JWT_REFRESH_TOKEN_EXPIRY", 604800); // 7 days

        let default_avatar = std::env::var("DEFAULT_AVATAR_URL")
            .unwrap_or_else(|_| "/media/default-avatar.png".to_string());

        let debug = std::env::var("APP_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        AppSettings {
            jwt_secret,
            access_token_expiry,
            refresh_token_expiry,
            default_avatar,
            debug,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Initialize application configuration and state
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Cache for rendered collection payloads. Mutations invalidate whole
    // collections via predicate; the TTL is only a backstop.
    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(300)) // 5 minutes
        .support_invalidation_closures()
        .build();

    Ok(AppState {
        db,
        cache,
        settings: AppSettings::from_env(),
    })
}

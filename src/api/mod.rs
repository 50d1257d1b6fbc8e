mod auth;
mod error;
mod health;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::Database;
use crate::jwt::TokenManager;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    tokens: Arc<TokenManager>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        auth: AuthService::new(db.users(), tokens),
    };

    Router::new()
        .nest("/health", health::router())
        .nest("/auth", auth::router(auth_state, rate_limit))
}

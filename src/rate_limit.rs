//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Rate limiting configuration for the login endpoint.
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts (5 at once, then 1 per second)
    pub login: IpLimiter,
    /// Key on the first `X-Forwarded-For` entry instead of the peer address
    pub trust_forwarded: bool,
}

impl RateLimitConfig {
    pub fn new(trust_forwarded: bool) -> Self {
        Self {
            login: RateLimiter::keyed(Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST)),
            trust_forwarded,
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.trust_forwarded) {
        Ok(ip) => ip,
        Err(_) => {
            return ApiError::forbidden("unable to determine client IP").into_response();
        }
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Login rate limit exceeded");
            ApiError::too_many_requests("too many login attempts, try again later").into_response()
        }
    }
}

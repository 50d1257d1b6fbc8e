//! Authentication API endpoints.
//!
//! - POST `/login` - Exchange username and password for a token pair
//! - POST `/refresh` - Exchange refresh token for new access token
//! - GET `/me` - Identify the bearer of an access token

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{AuthService, BearerToken};
use crate::db::UserStore;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct AuthState {
    pub auth: AuthService<UserStore>,
}

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/me", get(me))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }

    let tokens = state
        .auth
        .login(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::from_auth(e, "invalid credentials"))?;

    Ok(Json(tokens))
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
}

async fn refresh(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    if payload.refresh_token.is_empty() {
        return Err(ApiError::bad_request("refresh_token is required"));
    }

    let access_token = state
        .auth
        .refresh(&payload.refresh_token)
        .await
        .map_err(|e| ApiError::from_auth(e, "invalid refresh token"))?;

    Ok(Json(RefreshResponse { access_token }))
}

async fn me(
    State(state): State<AuthState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let info = state
        .auth
        .who_am_i(&token)
        .await
        .map_err(|e| ApiError::from_auth(e, "invalid access token"))?;

    Ok(Json(info))
}

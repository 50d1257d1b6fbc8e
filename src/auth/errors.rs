//! Authentication error types.

use crate::jwt::TokenError;

/// Errors returned by [`AuthService`](super::AuthService).
///
/// Token failures are collapsed here: login and refresh callers only learn
/// that they were rejected, never whether the token was malformed, forged or
/// expired, or whether the username exists.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown username or wrong password
    AuthenticationFailed,
    /// Token failed validation or was of the wrong kind
    InvalidToken,
    /// Token was valid but its user no longer exists
    UserNotFound,
    /// Token manager failed to sign a new token
    InternalTokenError(TokenError),
    /// User store lookup failed
    Store(sqlx::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::AuthenticationFailed => write!(f, "Invalid credentials"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::InternalTokenError(e) => write!(f, "Failed to generate token: {}", e),
            AuthError::Store(e) => write!(f, "User store error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::InternalTokenError(e) => Some(e),
            AuthError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Store(e)
    }
}

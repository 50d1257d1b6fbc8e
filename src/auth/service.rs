//! Login, refresh and identity lookup on top of the token manager.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::errors::AuthError;
use super::password::verify_password;
use crate::db::User;
use crate::jwt::{TokenKind, TokenManager};

/// Compared against when the username does not exist. Never matches a login.
const UNKNOWN_USER_CREDENTIAL: &str = "unknown-user-credential-0123456789";

/// Read access to user records, by username or by ID.
pub trait UserLookup: Send + Sync {
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;

    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
}

/// Tokens issued on a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity of the bearer of an access token, as currently stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
}

pub struct AuthService<S> {
    users: S,
    tokens: Arc<TokenManager>,
}

impl<S: Clone> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<S: UserLookup> AuthService<S> {
    pub fn new(users: S, tokens: Arc<TokenManager>) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Check credentials and issue an access/refresh token pair.
    ///
    /// An unknown username and a wrong password produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(user) = self.users.get_by_username(username).await? else {
            // Same comparison work as for a known user.
            std::hint::black_box(verify_password(UNKNOWN_USER_CREDENTIAL, password));
            debug!(username = %username, "Login for unknown user");
            return Err(AuthError::AuthenticationFailed);
        };

        if !verify_password(&user.password, password) {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(AuthError::AuthenticationFailed);
        }

        let access_token = self
            .tokens
            .generate_access_token(user.id, &user.username)
            .map_err(AuthError::InternalTokenError)?;
        let refresh_token = self
            .tokens
            .generate_refresh_token(user.id, &user.username)
            .map_err(AuthError::InternalTokenError)?;

        info!(user_id = user.id, "User logged in");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token itself is left untouched and can be used again until
    /// it expires.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self
            .tokens
            .validate_token_of_kind(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                debug!(error = %e, "Rejected refresh token");
                AuthError::InvalidToken
            })?;

        self.tokens
            .generate_access_token(claims.user_id, &claims.username)
            .map_err(AuthError::InternalTokenError)
    }

    /// Resolve an access token to the user record it was issued for.
    pub async fn who_am_i(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let claims = self
            .tokens
            .validate_token_of_kind(access_token, TokenKind::Access)
            .map_err(|e| {
                debug!(error = %e, "Rejected access token");
                AuthError::InvalidToken
            })?;

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo {
            id: user.id,
            username: user.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<HashMap<i64, User>>,
    }

    impl MemoryUsers {
        fn with(users: &[(i64, &str, &str)]) -> Self {
            let store = Self::default();
            for (id, username, password) in users {
                store.users.lock().unwrap().insert(
                    *id,
                    User {
                        id: *id,
                        username: username.to_string(),
                        password: password.to_string(),
                    },
                );
            }
            store
        }

        fn remove(&self, id: i64) {
            self.users.lock().unwrap().remove(&id);
        }

        fn rename(&self, id: i64, username: &str) {
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                user.username = username.to_string();
            }
        }
    }

    impl UserLookup for MemoryUsers {
        async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }
    }

    struct BrokenUsers;

    impl UserLookup for BrokenUsers {
        async fn get_by_username(&self, _username: &str) -> Result<Option<User>, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }

        async fn get_by_id(&self, _id: i64) -> Result<Option<User>, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }
    }

    fn token_manager() -> Arc<TokenManager> {
        Arc::new(TokenManager::new(b"test-secret-key", 15 * 60, 168 * 60 * 60).unwrap())
    }

    fn service() -> AuthService<MemoryUsers> {
        AuthService::new(MemoryUsers::with(&[(1, "alice", "wonderland")]), token_manager())
    }

    #[tokio::test]
    async fn test_login_success() {
        let service = service();

        let pair = service.login("alice", "wonderland").await.unwrap();

        let access = service.tokens().validate_token(&pair.access_token).unwrap();
        assert_eq!(access.user_id, 1);
        assert_eq!(access.username, "alice");
        assert_eq!(access.kind, TokenKind::Access);

        let refresh = service.tokens().validate_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.user_id, 1);
        assert_eq!(refresh.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let result = service().login("alice", "wrong-password").await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let result = service().login("bob", "wonderland").await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_with_placeholder_credential() {
        let result = service().login("bob", UNKNOWN_USER_CREDENTIAL).await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_login_errors_are_indistinguishable() {
        let service = service();

        let unknown = service.login("bob", "x").await.unwrap_err();
        let wrong = service.login("alice", "x").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_store_failure_is_not_auth_failure() {
        let service = AuthService::new(BrokenUsers, token_manager());

        let result = service.login("alice", "wonderland").await;
        assert!(matches!(result, Err(AuthError::Store(_))));
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        let access = service.refresh(&pair.refresh_token).await.unwrap();

        let claims = service.tokens().validate_token(&access).unwrap();
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn test_refresh_token_is_reusable() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        assert!(service.refresh(&pair.refresh_token).await.is_ok());
        assert!(service.refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_bad_tokens() {
        let service = service();

        let result = service.refresh("not-a-token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        let other = TokenManager::new(b"other-secret", 60, 60).unwrap();
        let forged = other.generate_refresh_token(1, "alice").unwrap();
        let result = service.refresh(&forged).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_token() {
        let tokens = Arc::new(TokenManager::new(b"test-secret-key", 60, -60).unwrap());
        let service = AuthService::new(MemoryUsers::with(&[(1, "alice", "pw")]), tokens);

        let pair = service.login("alice", "pw").await.unwrap();
        let result = service.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        let result = service.refresh(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_who_am_i() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        let info = service.who_am_i(&pair.access_token).await.unwrap();
        assert_eq!(
            info,
            UserInfo {
                id: 1,
                username: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_who_am_i_reports_stored_username() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        service.users.rename(1, "alice2");

        let info = service.who_am_i(&pair.access_token).await.unwrap();
        assert_eq!(info.username, "alice2");
    }

    #[tokio::test]
    async fn test_who_am_i_deleted_user() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        service.users.remove(1);

        let result = service.who_am_i(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_who_am_i_rejects_refresh_token() {
        let service = service();
        let pair = service.login("alice", "wonderland").await.unwrap();

        let result = service.who_am_i(&pair.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_who_am_i_store_failure() {
        let tokens = token_manager();
        let token = tokens.generate_access_token(1, "alice").unwrap();
        let service = AuthService::new(BrokenUsers, tokens);

        let result = service.who_am_i(&token).await;
        assert!(matches!(result, Err(AuthError::Store(_))));
    }

    #[test]
    fn test_internal_error_keeps_source() {
        let err = AuthError::InternalTokenError(TokenError::SigningError);
        assert!(std::error::Error::source(&err).is_some());
    }
}

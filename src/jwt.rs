//! JWT token generation and validation.
//!
//! Access and refresh tokens share one claim layout and one validation routine.
//! The `typ` claim records which call produced a token; callers that care
//! about the distinction use [`TokenManager::validate_token_of_kind`].

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token presented on every request
    Access,
    /// Long-lived token exchanged for new access tokens
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID from the user store
    pub user_id: i64,
    /// Username at the time of issue
    pub username: String,
    /// Token type
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Signs and validates tokens with a fixed secret and fixed lifetimes.
///
/// Lifetimes are signed second counts. Zero or negative values are honoured
/// as given and produce tokens that are already expired.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a token manager. The secret must not be empty.
    pub fn new(secret: &[u8], access_ttl: i64, refresh_ttl: i64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        let now = unix_now().map_err(|_| TokenError::SigningError)?;
        self.generate_token_at(TokenKind::Access, user_id, username, now)
    }

    /// Generate a refresh token for a user.
    pub fn generate_refresh_token(&self, user_id: i64, username: &str) -> Result<String, TokenError> {
        let now = unix_now().map_err(|_| TokenError::SigningError)?;
        self.generate_token_at(TokenKind::Refresh, user_id, username, now)
    }

    /// Generate a token as if the current time were `now`.
    ///
    /// Identical arguments always yield the identical token string.
    pub fn generate_token_at(
        &self,
        kind: TokenKind,
        user_id: i64,
        username: &str,
        now: i64,
    ) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            kind,
            exp: now.saturating_add(ttl),
            iat: now,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| TokenError::SigningError)
    }

    /// Validate a token of either kind and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let now = unix_now()?;
        self.validate_token_at(token, now)
    }

    /// Validate a token and require it to be of the given kind.
    pub fn validate_token_of_kind(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_token(token)?;

        if claims.kind != expected {
            return Err(TokenError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Validate a token as if the current time were `now`.
    pub fn validate_token_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below so that a token is rejected at exactly `exp`.
        validation.validate_exp = false;
        // jsonwebtoken reads registered claims as u64, so a negative `exp` would
        // count as missing. `TokenClaims` already requires every field.
        validation.required_spec_claims.clear();

        let token_data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::from)?;

        if now >= token_data.claims.exp {
            return Err(TokenError::ExpiredToken);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<i64, TokenError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::TimeError)?
        .as_secs();
    i64::try_from(secs).map_err(|_| TokenError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The signing secret was empty
    EmptySecret,
    /// Token is not a well-formed JWT (segments, base64, JSON or missing claims)
    MalformedToken,
    /// Signature does not match, or the header names another algorithm
    InvalidSignature,
    /// Token is at or past its expiration time
    ExpiredToken,
    /// Token is valid but of the other kind
    WrongTokenType,
    /// Claims could not be serialized or signed
    SigningError,
    /// System time error
    TimeError,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::InvalidSignature
            }
            ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
            _ => TokenError::MalformedToken,
        }
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::EmptySecret => write!(f, "Signing secret must not be empty"),
            TokenError::MalformedToken => write!(f, "Malformed token"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::ExpiredToken => write!(f, "Token has expired"),
            TokenError::WrongTokenType => write!(f, "Wrong token type"),
            TokenError::SigningError => write!(f, "Failed to sign token"),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

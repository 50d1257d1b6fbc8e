//! Username/password authentication with JWT access and refresh tokens.
//!
//! Access tokens are short-lived and presented as bearer tokens. Refresh
//! tokens are long-lived and exchanged for new access tokens. Neither is
//! tracked server-side: a token is valid until it expires.

mod errors;
mod extractors;
mod ip;
mod password;
mod service;

pub use errors::AuthError;
pub use extractors::{BearerToken, bearer_token};
pub use ip::extract_client_ip;
pub use password::verify_password;
pub use service::{AuthService, TokenPair, UserInfo, UserLookup};

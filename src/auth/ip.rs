//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Header consulted first when running behind a reverse proxy.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Extract the client IP address of a request.
///
/// With `trust_forwarded` set, the first entry of `X-Forwarded-For` wins.
/// Otherwise, and when the header is absent, the socket address from
/// `ConnectInfo` is used.
pub fn extract_client_ip(request: &Request, trust_forwarded: bool) -> Result<String, &'static str> {
    if trust_forwarded {
        if let Some(value) = request.headers().get(FORWARDED_FOR) {
            let value = value
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            if let Some(first) = value.split(',').next().map(str::trim) {
                if !first.is_empty() {
                    return Ok(first.to_string());
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .ok_or("No client IP available")
}

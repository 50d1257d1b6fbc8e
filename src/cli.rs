//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use clap::Parser;
use rand::distr::{Alphanumeric, SampleString};
use tracing::{error, info, warn};

const RECOMMENDED_JWT_SECRET_LENGTH: usize = 32;

const GENERATED_PASSWORD_LENGTH: usize = 24;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokengate",
    about = "JWT authentication service for username/password logins"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tokengate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime, e.g. "15m" or "1h30m"
    #[arg(long, env = "JWT_ACCESS_TOKEN_DURATION", default_value = "15m",
        value_parser = parse_duration, allow_hyphen_values = true)]
    pub access_token_duration: i64,

    /// Refresh token lifetime, e.g. "168h"
    #[arg(long, env = "JWT_REFRESH_TOKEN_DURATION", default_value = "168h",
        value_parser = parse_duration, allow_hyphen_values = true)]
    pub refresh_token_duration: i64,

    /// Create a user with a random password on startup and print the credentials
    #[arg(long, value_name = "USERNAME")]
    pub create_user: Option<String>,

    /// Rate limit logins by the first X-Forwarded-For address (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a duration such as "15m", "168h", "1h30m" or "-1h" into seconds.
///
/// A bare "0" is accepted. Units are `h`, `m` and `s`.
pub fn parse_duration(s: &str) -> Result<i64, String> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    if body == "0" {
        return Ok(0);
    }
    if body.is_empty() {
        return Err(format!("Invalid duration: {:?}", s));
    }

    let mut total: i64 = 0;
    let mut digits = String::new();

    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit: i64 = match c {
            'h' => 60 * 60,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("Unknown unit {:?} in duration {:?}", c, s)),
        };

        if digits.is_empty() {
            return Err(format!("Missing number before {:?} in duration {:?}", c, s));
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| format!("Duration out of range: {:?}", s))?;
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("Duration out of range: {:?}", s))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("Missing unit in duration {:?}", s));
    }

    Ok(if negative { -total } else { total })
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.is_empty() {
        error!("JWT secret must not be empty");
        return None;
    }

    if secret.len() < RECOMMENDED_JWT_SECRET_LENGTH {
        warn!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            RECOMMENDED_JWT_SECRET_LENGTH
        );
    }

    Some(secret)
}

/// Handle the --create-user flag: create the user and print its password.
pub async fn handle_create_user(db: &Database, username: &str) {
    let username = username.trim();
    if username.is_empty() {
        error!("--create-user requires a non-empty username");
        std::process::exit(1);
    }

    let password = Alphanumeric.sample_string(&mut rand::rng(), GENERATED_PASSWORD_LENGTH);

    match db.users().create(username, &password).await {
        Ok(id) => {
            info!(user_id = id, username = %username, "User created");
            println!();
            println!("User created: {}", username);
            println!("Password: {}", password);
            println!();
        }
        Err(e) => {
            error!(username = %username, error = %e, "Failed to create user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    jwt_secret: String,
    access_ttl: i64,
    refresh_ttl: i64,
    trust_forwarded_for: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl,
        refresh_ttl,
        trust_forwarded_for,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

use clap::Parser;
use tokengate::cli::{
    Args, build_config, handle_create_user, init_logging, load_jwt_secret, open_database,
};
use tokengate::{create_app, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(username) = args.create_user.as_deref() {
        handle_create_user(&db, username).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(
        db,
        jwt_secret,
        args.access_token_duration,
        args.refresh_token_duration,
        args.trust_forwarded_for,
    );
    let app = create_app(&config).unwrap_or_else(|e| {
        error!(error = %e, "Invalid token configuration");
        std::process::exit(1);
    });

    match listener.local_addr() {
        Ok(local_addr) => info!(
            address = %local_addr,
            access_ttl = config.access_ttl,
            refresh_ttl = config.refresh_ttl,
            "Listening"
        ),
        Err(e) => error!(error = %e, "Failed to get local address"),
    }

    if let Err(e) = run_server(app, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server exited");
}

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tether_api::auth::{AppState, AppStateInner};

/// Built once from the environment at startup, then passed into the
/// shared state and never mutated.
struct Config {
    jwt_secret: String,
    db_path: String,
    host: String,
    port: u16,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let jwt_secret =
            std::env::var("TETHER_JWT_SECRET").context("TETHER_JWT_SECRET not set")?;
        let db_path = std::env::var("TETHER_DB_PATH").unwrap_or_else(|_| "tether.db".into());
        let host = std::env::var("TETHER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("TETHER_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("TETHER_PORT is not a valid port")?;

        Ok(Self {
            jwt_secret,
            db_path,
            host,
            port,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = tether_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = tether_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Tether server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

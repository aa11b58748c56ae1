//! # rosterd API Server
//!
//! HTTP backend for user accounts and organization rosters:
//! - User CRUD with self-registration, avatar uploads, and role flags
//! - Organization CRUD with membership rosters
//! - JWT authentication (access/refresh pairs)
//! - Static serving of stored media
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p rosterd-api
//! ```

use rosterd_api::{
    app::{build_router, AppState},
    config::Config,
};
use rosterd_shared::db::{create_pool, pool::close_pool, run_migrations, DatabaseConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rosterd_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rosterd API server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::warn!("Failed to listen for shutdown signal: {}", e),
    }
}

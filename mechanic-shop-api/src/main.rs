//! # Mechanic Shop API Server
//!
//! Serves the mechanic shop HTTP API: customers, mechanics, inventory and
//! service tickets, with per-route rate limits and a cached ticket list.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p mechanic-shop-api
//! ```
//!
//! With `DATABASE_URL` set the server runs migrations and uses PostgreSQL;
//! otherwise it keeps everything in memory.

use mechanic_shop_api::{
    app::{build_router, AppState},
    config::Config,
};
use mechanic_shop_shared::{
    db::{migrations, pool},
    store::{memory::InMemoryStore, postgres::PgStore, ResourceStore},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mechanic_shop_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Mechanic Shop API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let mut pg_pool = None;
    let store: Arc<dyn ResourceStore> = match &config.database {
        Some(database) => {
            migrations::ensure_database_exists(&database.url).await?;
            let db = pool::create_pool(pool::DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await?;
            migrations::run_migrations(&db).await?;
            tracing::info!("Using PostgreSQL store");

            pg_pool = Some(db.clone());
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(db) = pg_pool {
        pool::close_pool(db).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

//! # Move2Play Store
//!
//! The entry point that assembles the application based on configuration and
//! compile-time features.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api_adapters::{build_router, AppState, RouterOptions};
use configs::{DatabaseSettings, LogFormat, LogSettings, Settings, StorageBackend};
use domains::{GameRepository, PurchaseRepository};
use storage_adapters::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = configs::load_env_file();
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);
    if let Some(e) = env_file {
        warn!(error = %e, "ignoring unreadable .env file");
    }

    // 1. Initialize the persistence gateway
    let (games, purchases) = build_repositories(&settings.database).await?;

    // 2. Wire services and routes
    let state = AppState::new(games, purchases);
    let app = build_router(
        state,
        RouterOptions {
            allow_any_origin: settings.cors.allow_any_origin,
        },
    );

    // 3. Serve until SIGINT/SIGTERM
    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "move2play store listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn build_repositories(
    database: &DatabaseSettings,
) -> anyhow::Result<(Arc<dyn GameRepository>, Arc<dyn PurchaseRepository>)> {
    match database.backend {
        StorageBackend::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            let developer_id = seed_local_developer(&store).await;
            info!(developer_id, "seeded a local developer for uploads");
            let store = Arc::new(store);
            let games: Arc<dyn GameRepository> = store.clone();
            let purchases: Arc<dyn PurchaseRepository> = store;
            Ok((games, purchases))
        }
        #[cfg(feature = "db-postgres")]
        StorageBackend::Postgres => {
            use secrecy::ExposeSecret;

            let store = storage_adapters::PgStore::connect(
                database.url.expose_secret(),
                database.max_connections,
            )
            .await
            .context("failed to connect to the database")?;
            if database.run_migrations {
                store.migrate().await.context("failed to run migrations")?;
            }
            info!(max_connections = database.max_connections, "connected to postgres");
            let store = Arc::new(store);
            let games: Arc<dyn GameRepository> = store.clone();
            let purchases: Arc<dyn PurchaseRepository> = store;
            Ok((games, purchases))
        }
        #[cfg(not(feature = "db-postgres"))]
        StorageBackend::Postgres => {
            anyhow::bail!("postgres backend requested but the `db-postgres` feature is disabled")
        }
    }
}

/// The memory backend has no way to create developers over HTTP, so one is
/// inserted up front for `POST /api/Games`.
async fn seed_local_developer(store: &MemoryStore) -> i32 {
    store
        .insert_developer("Local Developer", Some("dev@localhost"))
        .await
}

async fn shutdown_signal() {
    let ctrl_c = until_signal("ctrl-c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Resolves when `signal` fires. A listener that fails never resolves, so it
/// cannot trigger a shutdown on its own.
async fn until_signal(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!(error = %e, signal = name, "failed to listen for signal");
        std::future::pending::<()>().await;
    }
}

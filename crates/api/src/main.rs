use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use curfew_core::clock::{Clock, SystemClock};
use curfew_core::memory::{MemorySessionStore, MemoryTtlStore};
use curfew_core::store::{SessionStore, TtlStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curfew_api::config::ServerConfig;
use curfew_api::router::build_app_router;
use curfew_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curfew_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Stores ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (sessions, ttl_store): (Arc<dyn SessionStore>, Arc<dyn TtlStore>) =
        match config.database_url.as_deref() {
            Some(database_url) => {
                let pool = curfew_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                curfew_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                tracing::info!("Database health check passed");

                curfew_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                let sessions: Arc<dyn SessionStore> =
                    Arc::new(curfew_db::PgSessionStore::new(pool.clone()));
                let ttl_store: Arc<dyn TtlStore> = Arc::new(curfew_db::PgTtlStore::new(pool));
                (sessions, ttl_store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
                let ttl_store: Arc<dyn TtlStore> =
                    Arc::new(MemoryTtlStore::new(Arc::clone(&clock)));
                (sessions, ttl_store)
            }
        };

    // --- App state ---
    let state = AppState::new(config.clone(), sessions, ttl_store, clock);

    // Grants, blocks and session records from a previous process refer to
    // connections that no longer exist.
    if config.reset_stores_on_start {
        state
            .ttl_store
            .clear()
            .await
            .expect("Failed to clear expiring keys");
        let stale = state
            .lifecycle
            .delete_all_sessions()
            .await
            .expect("Failed to clear stale sessions");
        tracing::info!(stale, "Stores reset on start");
    }

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown_state = state.clone();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;

            // Device sockets are upgraded connections and would otherwise keep
            // the server alive until the devices hang up.
            shutdown_state.keepalive.shutdown();
            shutdown_state.registry.shutdown_all();

            tokio::spawn(async move {
                tokio::time::sleep(shutdown_timeout).await;
                tracing::warn!("Shutdown timeout elapsed, exiting");
                std::process::exit(1);
            });
        })
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

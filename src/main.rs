//! CipherChat server.
//!
//! Entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use cipherchat_api::state::AppState;
use cipherchat_auth::cleanup::SessionCleanup;
use cipherchat_auth::gate::SessionGate;
use cipherchat_auth::jwt::CredentialEncoder;
use cipherchat_core::config::AppConfig;
use cipherchat_core::error::AppError;
use cipherchat_core::traits::{Backplane, MessageStore, SessionStore, UserDirectory};
use cipherchat_database::DatabasePool;
use cipherchat_database::repositories::{MessageRepository, SessionRepository, UserRepository};
use cipherchat_realtime::connection::{ConnectionManager, ConnectionPool};
use cipherchat_realtime::{DeliveryEngine, LocalBackplane};

#[tokio::main]
async fn main() {
    let env = std::env::var("CIPHERCHAT_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CipherChat v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!("Connecting to database...");
    let db = DatabasePool::connect(&config.database).await?;
    db.health_check().await?;
    tracing::info!("Database connection established");

    let sessions: Arc<dyn SessionStore> =
        Arc::new(SessionRepository::new(db.pool().clone()));
    let messages: Arc<dyn MessageStore> =
        Arc::new(MessageRepository::new(db.pool().clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(UserRepository::new(db.pool().clone()));

    let gate = Arc::new(SessionGate::new(&config.auth, sessions.clone()));
    let encoder = Arc::new(CredentialEncoder::new(&config.auth));

    let connections = Arc::new(ConnectionPool::new());
    let backplane = build_backplane(&config, connections.clone());
    let manager = Arc::new(ConnectionManager::new(
        connections,
        config.realtime.max_connections_per_user,
    ));
    let engine = Arc::new(DeliveryEngine::new(
        messages,
        backplane,
        manager,
        &config.realtime,
    ));

    let cleanup = SessionCleanup::new(
        sessions.clone(),
        config.session.cleanup_interval_minutes,
    )
    .spawn();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config: Arc::new(config),
        gate,
        engine,
        encoder,
        users,
        sessions,
    };
    let app = cipherchat_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("CipherChat server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    cleanup.abort();
    db.close().await;
    tracing::info!("CipherChat server shut down gracefully");
    Ok(())
}

/// Builds the delivery backplane, attaching the Redis relay when the
/// feature is compiled in and a URL is configured.
#[cfg(feature = "redis-pubsub")]
fn build_backplane(config: &AppConfig, pool: Arc<ConnectionPool>) -> Arc<dyn Backplane> {
    use cipherchat_realtime::backplane::RedisRelay;

    match &config.realtime.redis_url {
        Some(url) => {
            tracing::info!("Attaching Redis backplane relay");
            let relay = Arc::new(RedisRelay::new(url));
            let backplane = Arc::new(LocalBackplane::with_relay(pool, relay.clone()));
            relay.spawn_subscriber(backplane.clone());
            backplane
        }
        None => Arc::new(LocalBackplane::new(pool)),
    }
}

#[cfg(not(feature = "redis-pubsub"))]
fn build_backplane(_config: &AppConfig, pool: Arc<ConnectionPool>) -> Arc<dyn Backplane> {
    Arc::new(LocalBackplane::new(pool))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Eventreg application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Open the configured store backends (Redis or in-memory)
//! 3. Upsert the provisioned admin account
//! 4. Start the expired-session sweep
//! 5. Build the router and serve until SIGINT/SIGTERM
//!
//! Also supports the `hash-password` subcommand for provisioning admins.

use eventreg::{
    auth::{hash_password, middleware::AppState, AuthGate},
    cleanup::run_session_sweep,
    config::{Backend, Config, ConfigError},
    routes,
    storage::{
        memory::{MemorySessionStore, MemoryStore},
        redis_store::RedisStore,
        AdminStore, EventStore, ParticipantStore, SessionStore, StoreError,
    },
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn print_hash_password_usage() {
    eprintln!("Usage: eventreg hash-password <password>");
    eprintln!();
    eprintln!("Print an Argon2id hash of <password> for ADMIN_PASSWORD_HASH.");
    eprintln!();
    eprintln!("Then set in .env:");
    eprintln!("  ADMIN_USERNAME=admin");
    eprintln!("  ADMIN_PASSWORD_HASH='<output>'");
}

#[tokio::main]
async fn main() {
    // Check for hash-password subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "hash-password" {
        if args.len() != 3 {
            print_hash_password_usage();
            std::process::exit(1);
        }

        match hash_password(&args[2]) {
            Ok(hash) => println!("{}", hash),
            Err(e) => {
                eprintln!("Error hashing password: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Starting eventreg on {}", config.bind_addr);

    // Connect to Redis only if some backend needs it
    let redis = if config.storage_backend == Backend::Redis
        || config.session_backend == Backend::Redis
    {
        let url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("REDIS_URL".to_string()))?;
        let store = RedisStore::open(url, config.session_ttl_secs)?;
        store.ping().await?;
        tracing::info!("Connected to Redis");
        Some(Arc::new(store))
    } else {
        None
    };

    let (admins, events, participants) = match (config.storage_backend, &redis) {
        (Backend::Redis, Some(store)) => (
            store.clone() as Arc<dyn AdminStore>,
            store.clone() as Arc<dyn EventStore>,
            store.clone() as Arc<dyn ParticipantStore>,
        ),
        _ => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone() as Arc<dyn AdminStore>,
                store.clone() as Arc<dyn EventStore>,
                store as Arc<dyn ParticipantStore>,
            )
        }
    };

    let sessions = match (config.session_backend, &redis) {
        (Backend::Redis, Some(store)) => store.clone() as Arc<dyn SessionStore>,
        _ => Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
    };

    // Upsert the provisioned admin (keeps its id if it already exists)
    match &config.admin_password_hash {
        Some(hash) => {
            let admin = admins.upsert_admin(&config.admin_username, hash).await?;
            tracing::info!(username = %admin.username, admin_id = %admin.admin_id, "Admin account configured");
        }
        None => {
            tracing::warn!("ADMIN_PASSWORD_HASH not set; using existing admin accounts only");
        }
    }

    let policy = config.session_policy();
    tokio::spawn(run_session_sweep(
        sessions.clone(),
        policy,
        Duration::from_secs(config.session_sweep_secs),
    ));

    let bind_addr = config.bind_addr;
    let state = AppState {
        gate: Arc::new(AuthGate::new(admins, sessions, policy)),
        events,
        participants,
        config: Arc::new(config),
    };

    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl-C).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl-C");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info, warn};

use tutorial_rest_api::{
    config::{Config, StoreBackend},
    create_router,
    db::Database,
    middleware::init_tracing,
    pagination::{CursorCodec, ORDERING_KEY},
    AppState, MemoryStore, TutorialStore,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = match open_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize tutorial store: {}", e);
            std::process::exit(1);
        }
    };

    let cursors = match config.cursor_secret {
        Some(ref secret) => CursorCodec::new(ORDERING_KEY, secret.as_bytes()),
        None => {
            warn!("CURSOR_SECRET not set, pagination cursors will not survive a restart");
            CursorCodec::with_random_secret(ORDERING_KEY)
        }
    };
    let cursors = match cursors {
        Ok(cursors) => cursors,
        Err(e) => {
            error!("Failed to initialize cursor codec: {:#}", e);
            std::process::exit(1);
        }
    };

    let app = create_router(AppState::new(store, cursors), &config.http);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Start the server with graceful shutdown handling
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Connects the configured backend and runs migrations where they apply
async fn open_store(
    backend: &StoreBackend,
) -> Result<Arc<dyn TutorialStore>, tutorial_rest_api::ApiError> {
    match backend {
        StoreBackend::Postgres(db_config) => {
            let database = Database::new(db_config.clone()).await?;
            info!("Database connection established");

            database.migrate().await?;
            info!("Database migrations completed successfully");

            Ok(Arc::new(database))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory tutorial store, data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Graceful shutdown signal handler
/// Listens for SIGTERM and SIGINT signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, initiating graceful shutdown");
        },
    }
}

//! LEXIS API Server Entry Point
//!
//! Bootstraps configuration, starts listening, then connects to the
//! database in the background. Requests that need the database wait for it.

use std::net::SocketAddr;

use lexis_api::{
    create_router, init_tracing, ApiConfig, ApiError, ApiResult, AppState, TelemetryConfig,
};
use lexis_core::ParamRegistry;
use lexis_storage::{
    DbConfig, DocumentStore, LifecycleConfig, PgConnectionManager, PgConnector, StorageError,
};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let db_config = DbConfig::from_env();
    let lifecycle = LifecycleConfig::from_env();
    tracing::debug!(?db_config, ?lifecycle, "Database configuration loaded");

    let params = ParamRegistry::service_default()
        .map_err(|e| ApiError::internal_error(format!("Invalid parameter schema: {}", e)))?;
    let db = PgConnectionManager::new(PgConnector::new(db_config), lifecycle);
    let app = create_router(AppState::new(params, db.clone(), api_config.clone()));

    let addr = api_config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::warn!(%addr, "Server listening on port {}", addr.port());

    // Connect once the listener is up. Never reaching READY at boot stops
    // the server.
    let (fatal_tx, fatal_rx) = oneshot::channel();
    let boot = {
        let db = db.clone();
        tokio::spawn(async move {
            let result = match db.init().await {
                Ok(()) => prepare_schema(&db).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                if !matches!(e, StorageError::ShutDown) {
                    tracing::error!(error = %e, "Database initialization failed, shutting down");
                    let _ = fatal_tx.send(());
                }
            }
            result
        })
    };

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(fatal_rx))
    .await
    .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)));

    // Voids an init still retrying.
    db.shutdown().await;
    let booted = boot
        .await
        .map_err(|e| ApiError::internal_error(format!("Database init task failed: {}", e)))?;
    tracing::warn!("Server stopped");

    served?;
    match booted {
        Ok(()) | Err(StorageError::ShutDown) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn prepare_schema(db: &PgConnectionManager) -> Result<(), StorageError> {
    let documents = DocumentStore::new(db.await_ready().await?);
    documents.ensure_schema().await?;
    tracing::info!("Document schema ready");
    Ok(())
}

/// Resolves on SIGINT, SIGTERM or a fatal boot failure.
async fn shutdown_signal(fatal: oneshot::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received SIGINT, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
        // A dropped sender means boot succeeded; keep serving.
        Ok(()) = fatal => {}
    }
}

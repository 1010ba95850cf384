//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use lexis_core::ParamRegistry;
use lexis_storage::{DocumentStore, PgConnectionManager};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::health::HealthRegistry;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Query parameter schema per path pattern.
    pub params: Arc<ParamRegistry>,
    /// Owner of the database connection. Handlers only call `await_ready`.
    pub db: PgConnectionManager,
    pub health: HealthRegistry,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the state, registering the database as a health probe.
    pub fn new(params: ParamRegistry, db: PgConnectionManager, config: ApiConfig) -> Self {
        let health = HealthRegistry::new().register(Arc::new(db.clone()));
        Self {
            params: Arc::new(params),
            db,
            health,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Document operations on the live connection.
    ///
    /// Waits for the database up to `db_wait_timeout`, then answers 503.
    pub async fn documents(&self) -> ApiResult<DocumentStore> {
        match tokio::time::timeout(self.config.db_wait_timeout, self.db.await_ready()).await {
            Ok(handle) => Ok(DocumentStore::new(handle?)),
            Err(_) => {
                tracing::warn!(state = %self.db.state(), "Timed out waiting for the database");
                Err(ApiError::service_unavailable("Database is not available"))
            }
        }
    }
}

impl FromRef<AppState> for Arc<ParamRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.params.clone()
    }
}

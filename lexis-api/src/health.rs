//! Health Check Endpoint
//!
//! `GET /manage/health` pulls every registered [`HealthProbe`] and answers
//! 200 only when all of them report healthy, 503 otherwise.
//!
//! No component pushes health changes; probes are asked on each request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lexis_storage::{ConnectionManager, Connector};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// PROBES
// ============================================================================

/// A component that can report whether it is usable right now.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Name shown in the health response.
    fn name(&self) -> &str;

    async fn is_healthy(&self) -> bool;
}

/// The database is healthy exactly when the manager is `READY`.
#[async_trait]
impl<C: Connector> HealthProbe for ConnectionManager<C> {
    fn name(&self) -> &str {
        "database"
    }

    async fn is_healthy(&self) -> bool {
        self.is_ready()
    }
}

/// Pull-based aggregator over registered probes.
#[derive(Clone, Default)]
pub struct HealthRegistry {
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Ask every probe, in registration order.
    pub async fn check(&self) -> Vec<ComponentHealth> {
        let mut components = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let status = if probe.is_healthy().await {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            };
            components.push(ComponentHealth {
                name: probe.name().to_string(),
                status,
            });
        }
        components
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
}

// ============================================================================
// HANDLER
// ============================================================================

/// GET /manage/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let components = state.health.check().await;
    let healthy = components
        .iter()
        .all(|component| component.status == HealthStatus::Healthy);

    let response = HealthResponse {
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_storage::{DbConfig, LifecycleConfig, PgConnectionManager, PgConnector};

    struct Fixed(&'static str, bool);

    #[async_trait]
    impl HealthProbe for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn is_healthy(&self) -> bool {
            self.1
        }
    }

    #[tokio::test]
    async fn test_registry_reports_in_order() {
        let registry = HealthRegistry::new()
            .register(Arc::new(Fixed("database", true)))
            .register(Arc::new(Fixed("cache", false)));

        let components = registry.check().await;
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].name, "database");
        assert_eq!(components[0].status, HealthStatus::Healthy);
        assert_eq!(components[1].status, HealthStatus::Unhealthy);
    }

    fn state_with(health: HealthRegistry) -> AppState {
        let db = PgConnectionManager::new(
            PgConnector::new(DbConfig::default()),
            LifecycleConfig::default(),
        );
        let mut state = AppState::new(
            lexis_core::ParamRegistry::new(),
            db,
            crate::config::ApiConfig::default(),
        );
        state.health = health;
        state
    }

    #[tokio::test]
    async fn test_empty_registry_answers_ok() {
        let response = health(State(state_with(HealthRegistry::new())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_one_unhealthy_probe_answers_503() {
        let registry = HealthRegistry::new()
            .register(Arc::new(Fixed("database", true)))
            .register(Arc::new(Fixed("cache", false)));
        let response = health(State(state_with(registry))).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }
}

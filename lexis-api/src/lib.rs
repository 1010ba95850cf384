//! LEXIS API - HTTP Layer
//!
//! Axum routes over the LEXIS document store. Query parameters are checked
//! against the [`lexis_core::ParamRegistry`] before a handler runs, and
//! handlers reach the database only through the connection manager in
//! [`AppState`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod health;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::QueryParams;
pub use health::{HealthProbe, HealthRegistry, HealthResponse, HealthStatus};
pub use routes::create_router;
pub use state::AppState;
pub use telemetry::{init_tracing, TelemetryConfig};

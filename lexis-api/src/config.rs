//! API Configuration Module
//!
//! Listener address and request-side limits, loaded from environment
//! variables with defaults for development.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind: String,

    /// Port to listen on.
    pub port: u16,

    /// How long a handler waits for the database to become ready before
    /// answering 503. The connection manager itself never times out.
    pub db_wait_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 9292,
            db_wait_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LEXIS_API_BIND`: interface to bind (default: 0.0.0.0)
    /// - `PORT`: listen port (default: 9292)
    /// - `LEXIS_API_DB_WAIT_MS`: handler wait for database readiness (default: 30000)
    ///
    /// # Errors
    /// Returns an error if `PORT` is set but is not a valid port number.
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind = std::env::var("LEXIS_API_BIND").unwrap_or(defaults.bind);

        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", value)))?,
            Err(_) => defaults.port,
        };

        let db_wait_timeout = std::env::var("LEXIS_API_DB_WAIT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.db_wait_timeout);

        Ok(Self {
            bind,
            port,
            db_wait_timeout,
        })
    }

    /// The socket address to listen on.
    pub fn socket_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}

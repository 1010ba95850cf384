//! PostgreSQL Connector
//!
//! A single `tokio-postgres` client per connection. The connection driver
//! runs on its own task and is aborted when the manager closes the handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::AbortHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::lifecycle::Connector;

// ============================================================================
// CONNECTION CONFIGURATION
// ============================================================================

/// Database endpoint and credentials.
#[derive(Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Application name reported to the server
    pub app_name: String,
    /// Timeout for a single connect attempt
    pub connect_timeout: Duration,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "lexis".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            app_name: "lexis-api".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("LEXIS_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("LEXIS_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("LEXIS_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("LEXIS_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("LEXIS_DB_PASSWORD").unwrap_or_default(),
            app_name: std::env::var("LEXIS_DB_APP_NAME").unwrap_or(defaults.app_name),
            connect_timeout: std::env::var("LEXIS_DB_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .application_name(&self.app_name)
            .connect_timeout(self.connect_timeout);
        cfg
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Cloneable handle to the live client.
#[derive(Clone)]
pub struct PgHandle {
    client: Arc<Client>,
    driver: AbortHandle,
}

impl PgHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl fmt::Debug for PgHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgHandle")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// [`Connector`] for PostgreSQL without TLS.
#[derive(Debug, Clone)]
pub struct PgConnector {
    config: DbConfig,
}

impl PgConnector {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgHandle;

    async fn connect(&self) -> StorageResult<PgHandle> {
        let (client, connection) = self
            .config
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "Database connection closed with error");
            }
        });
        debug!(host = %self.config.host, dbname = %self.config.dbname, "Database connection opened");

        Ok(PgHandle {
            client: Arc::new(client),
            driver: driver.abort_handle(),
        })
    }

    async fn ping(&self, handle: &PgHandle) -> StorageResult<()> {
        handle
            .client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| StorageError::ProbeFailure(e.to_string()))
    }

    async fn close(&self, handle: PgHandle) {
        handle.driver.abort();
        debug!("Database connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "lexis");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DbConfig {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("redacted"));
    }
}

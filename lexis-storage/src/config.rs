//! Connection lifecycle configuration.
//!
//! Loaded from environment variables with defaults sized for a service that
//! may start before its database does.

use std::time::Duration;

/// Retry and liveness-probe timing for the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Retries after the first failed connect attempt.
    pub connect_retries: u32,

    /// Fixed pause between connect attempts.
    pub retry_interval: Duration,

    /// Fixed period of the liveness ping once connected.
    pub probe_interval: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            // 721 attempts, one second apart: about twelve minutes.
            connect_retries: 720,
            retry_interval: Duration::from_secs(1),
            probe_interval: Duration::from_secs(10),
        }
    }
}

impl LifecycleConfig {
    /// Create LifecycleConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LEXIS_DB_CONNECT_RETRIES`: retries after the first attempt (default: 720)
    /// - `LEXIS_DB_RETRY_INTERVAL_MS`: pause between attempts (default: 1000)
    /// - `LEXIS_DB_PROBE_INTERVAL_MS`: liveness probe period (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let connect_retries = std::env::var("LEXIS_DB_CONNECT_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.connect_retries);

        let retry_interval = std::env::var("LEXIS_DB_RETRY_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_interval);

        let probe_interval = std::env::var("LEXIS_DB_PROBE_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.probe_interval);

        Self {
            connect_retries,
            retry_interval,
            probe_interval,
        }
    }

    /// Total connect attempts per connect procedure.
    pub fn attempts(&self) -> u32 {
        self.connect_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LifecycleConfig::default();
        assert_eq!(config.connect_retries, 720);
        assert_eq!(config.attempts(), 721);
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.probe_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_attempts_saturate() {
        let config = LifecycleConfig {
            connect_retries: u32::MAX,
            ..Default::default()
        };
        assert_eq!(config.attempts(), u32::MAX);
    }
}

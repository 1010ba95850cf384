//! LEXIS Test Utilities
//!
//! Shared test infrastructure for the LEXIS workspace:
//! - A scripted [`Connector`] that fails on demand and records concurrency
//! - Proptest generators for query values and request paths
//! - Fixtures for lifecycle timing and raw query pairs

pub use lexis_core::{ParamDefinition, ParamRegistry, ParamType, ParamValue};
pub use lexis_storage::{ConnectionManager, ConnectionState, Connector, LifecycleConfig};

use async_trait::async_trait;
use lexis_storage::{StorageError, StorageResult};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// SCRIPTED CONNECTOR
// ============================================================================

/// Handle produced by [`ScriptedConnector`]; `id` counts connects from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockHandle {
    pub id: u32,
}

#[derive(Debug, Default)]
struct Script {
    connect_failures: AtomicU32,
    ping_failures: AtomicU32,
    connect_delay_ms: AtomicU64,
    connects: AtomicU32,
    pings: AtomicU32,
    closes: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

/// In-memory connector whose failures are scripted by the test.
///
/// Clones share the script, so a test keeps one clone to steer and inspect
/// the connector it handed to a [`ConnectionManager`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Script>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect calls fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.script.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` ping calls fail.
    pub fn fail_next_pings(&self, n: u32) {
        self.script.ping_failures.store(n, Ordering::SeqCst);
    }

    /// Hold every connect call for `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.script
            .connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn connects(&self) -> u32 {
        self.script.connects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> u32 {
        self.script.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.script.closes.load(Ordering::SeqCst)
    }

    /// Highest number of connect calls observed running at once.
    pub fn max_in_flight(&self) -> u32 {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Handle = MockHandle;

    async fn connect(&self) -> StorageResult<MockHandle> {
        let now = self.script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.script.in_flight);
        self.script.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let id = self.script.connects.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.script.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if Self::take_failure(&self.script.connect_failures) {
            return Err(StorageError::Connect(format!("scripted failure #{}", id)));
        }
        Ok(MockHandle { id })
    }

    async fn ping(&self, _handle: &MockHandle) -> StorageResult<()> {
        self.script.pings.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.script.ping_failures) {
            return Err(StorageError::ProbeFailure("scripted ping failure".to_string()));
        }
        Ok(())
    }

    async fn close(&self, _handle: MockHandle) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for query values and request paths.

    use proptest::prelude::*;

    /// A lower-case path segment that is never the wildcard.
    pub fn arb_segment() -> impl Strategy<Value = String> {
        "[a-z0-9]{1,8}"
    }

    /// An absolute request path of 1 to 5 segments.
    pub fn arb_request_path() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_segment(), 1..=5).prop_map(|parts| format!("/{}", parts.join("/")))
    }

    /// A valid ISO-8601 date-time string with a four-digit year.
    pub fn arb_iso_date() -> impl Strategy<Value = String> {
        (
            1000i32..=9999,
            1u32..=12,
            1u32..=28,
            0u32..=23,
            0u32..=59,
            0u32..=59,
            prop::option::of(0u32..1000),
            any::<bool>(),
        )
            .prop_map(|(y, mo, d, h, mi, s, frac, zulu)| {
                let frac = frac.map(|f| format!(".{:03}", f)).unwrap_or_default();
                let zone = if zulu { "Z" } else { "" };
                format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{}", y, mo, d, h, mi, s, frac, zone)
            })
    }

    /// A comma-separated list of non-empty lower-case elements.
    pub fn arb_array_value() -> impl Strategy<Value = (String, Vec<String>)> {
        prop::collection::vec("[a-z]{1,6}", 1..6).prop_map(|items| (items.join(","), items))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built configurations and inputs.

    use super::*;

    /// Millisecond-scale retry and probe timing for lifecycle tests.
    pub fn fast_lifecycle(retries: u32) -> LifecycleConfig {
        LifecycleConfig {
            connect_retries: retries,
            retry_interval: Duration::from_millis(5),
            probe_interval: Duration::from_millis(20),
        }
    }

    /// Owned raw query pairs from string literals.
    pub fn raw_query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// A manager over a fresh scripted connector, plus a clone to steer it.
    pub fn scripted_manager(
        retries: u32,
    ) -> (ConnectionManager<ScriptedConnector>, ScriptedConnector) {
        let connector = ScriptedConnector::new();
        let manager = ConnectionManager::new(connector.clone(), fast_lifecycle(retries));
        (manager, connector)
    }
}

//! Database Connection Lifecycle
//!
//! Owns the single logical database connection and drives it through a
//! three-state machine:
//!
//! ```text
//!   DOWN ──init/retry──▶ CONNECTING ──ping ok──▶ READY
//!    ▲                       │                     │
//!    └──────attempt failed───┘                     │
//!    └──────────probe failed / shutdown────────────┘
//! ```
//!
//! Request handlers never hold the connection state themselves; they call
//! [`ConnectionManager::await_ready`], which returns immediately when the
//! manager is `READY` and otherwise parks the caller in a FIFO waiter queue
//! drained by the next `READY` transition.
//!
//! Only one connect procedure runs at a time. An explicit `init()` and a
//! reconnect triggered by the liveness probe serialize on the same gate.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::LifecycleConfig;
use crate::error::{StorageError, StorageResult};

const TRANSITION_CAPACITY: usize = 64;

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Connection state. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Down,
    Connecting,
    Ready,
}

impl ConnectionState {
    /// Whether `self → next` is an edge of the state machine.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Down, Connecting) | (Connecting, Ready) | (Connecting, Down) | (Ready, Down)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Down => "DOWN",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Ready => "READY",
        };
        f.write_str(text)
    }
}

/// A state change published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

// ============================================================================
// CONNECTOR SEAM
// ============================================================================

/// How to open, check and close the underlying database connection.
///
/// The manager decides when; implementations only decide how.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Cloneable handle given to request handlers.
    type Handle: Clone + Send + Sync + 'static;

    /// Open a new connection.
    async fn connect(&self) -> StorageResult<Self::Handle>;

    /// Round-trip to the database; `Err` means the connection is unusable.
    async fn ping(&self, handle: &Self::Handle) -> StorageResult<()>;

    /// Release the connection. Must not fail.
    async fn close(&self, handle: Self::Handle);
}

// ============================================================================
// MANAGER
// ============================================================================

struct Shared<H> {
    state: ConnectionState,
    handle: Option<H>,
    waiters: VecDeque<oneshot::Sender<H>>,
    /// Bumped on every READY transition.
    epoch: u64,
    /// Bumped on every shutdown; attempts from an older session are void.
    session: u64,
}

struct Inner<C: Connector> {
    connector: C,
    config: LifecycleConfig,
    shared: Mutex<Shared<C::Handle>>,
    events: broadcast::Sender<StateTransition>,
    connect_gate: tokio::sync::Mutex<()>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
}

/// Owner of the single logical database connection.
///
/// Cloning is cheap; all clones drive the same state machine.
pub struct ConnectionManager<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager in the `DOWN` state. Nothing connects until
    /// [`init`](Self::init) is called.
    pub fn new(connector: C, config: LifecycleConfig) -> Self {
        let (events, _rx) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                connector,
                config,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Down,
                    handle: None,
                    waiters: VecDeque::new(),
                    epoch: 0,
                    session: 0,
                }),
                events,
                connect_gate: tokio::sync::Mutex::new(()),
                probe_task: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_shared().state
    }

    /// Pull-based readiness, for health aggregation.
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Number of callers parked in [`await_ready`](Self::await_ready).
    pub fn pending_waiters(&self) -> usize {
        self.inner.lock_shared().waiters.len()
    }

    /// Subscribe to state transitions published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
        self.inner.events.subscribe()
    }

    /// Connect, retrying with a fixed backoff, then start the liveness probe.
    ///
    /// Resolves every pending [`await_ready`](Self::await_ready) caller on
    /// success.
    ///
    /// # Errors
    /// [`StorageError::ConnectionExhausted`] once the retry budget is spent;
    /// [`StorageError::ShutDown`] if [`shutdown`](Self::shutdown) runs
    /// meanwhile.
    pub async fn init(&self) -> StorageResult<()> {
        let observed_epoch = self.inner.lock_shared().epoch;
        {
            let _gate = self.inner.connect_gate.lock().await;
            let session = {
                let shared = self.inner.lock_shared();
                if shared.state == ConnectionState::Ready && shared.epoch != observed_epoch {
                    debug!("Database connected by a concurrent attempt");
                    return Ok(());
                }
                shared.session
            };
            self.inner.teardown().await;
            self.inner.connect_with_retry(session).await?;
            self.ensure_probe(session);
        }
        Ok(())
    }

    /// Close the connection and go `DOWN`, whatever the current state.
    ///
    /// Stops the liveness probe. Idempotent. Callers still waiting in
    /// [`await_ready`](Self::await_ready) stay queued for a later `init()`.
    pub async fn shutdown(&self) {
        // Bump the session before taking the probe so `ensure_probe` either
        // sees the new session or leaves its task in the slot for us.
        let handle = {
            let mut shared = self.inner.lock_shared();
            shared.session += 1;
            let handle = shared.handle.take();
            self.inner.transition(&mut shared, ConnectionState::Down);
            handle
        };
        let probe = self
            .inner
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = probe {
            task.abort();
        }
        if let Some(handle) = handle {
            self.inner.connector.close(handle).await;
        }
        info!("Database connection shut down");
    }

    /// Wait until the manager is `READY` and return the connection handle.
    ///
    /// Resolves at once when already `READY`. Otherwise the caller joins the
    /// waiter queue when this method is called (not when the future is first
    /// polled) and is resumed, in queue order, by the next `READY`
    /// transition. There is no timeout; wrap the future if one is needed.
    ///
    /// # Errors
    /// [`StorageError::Closed`] if every manager clone is dropped first.
    pub fn await_ready(
        &self,
    ) -> impl Future<Output = StorageResult<C::Handle>> + Send + 'static {
        let registered = {
            let mut shared = self.inner.lock_shared();
            let current = match shared.state {
                ConnectionState::Ready => shared.handle.clone(),
                _ => None,
            };
            match current {
                Some(handle) => Ok(handle),
                None => {
                    // Drop waiters whose caller stopped waiting.
                    shared.waiters.retain(|waiter| !waiter.is_closed());
                    let (tx, rx) = oneshot::channel();
                    shared.waiters.push_back(tx);
                    Err(rx)
                }
            }
        };
        async move {
            match registered {
                Ok(handle) => Ok(handle),
                Err(rx) => rx.await.map_err(|_| StorageError::Closed),
            }
        }
    }

    /// Start the liveness probe unless one is running or `session` is over.
    /// Caller must hold `connect_gate`.
    fn ensure_probe(&self, session: u64) {
        let mut slot = self
            .inner
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.lock_shared().session != session {
            return;
        }
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let inner = Arc::downgrade(&self.inner);
        let every = self.inner.config.probe_interval;
        *slot = Some(tokio::spawn(probe_loop(inner, every)));
        debug!(interval_ms = every.as_millis() as u64, "Liveness probe started");
    }
}

impl<C: Connector> Inner<C> {
    fn lock_shared(&self) -> MutexGuard<'_, Shared<C::Handle>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, shared: &mut Shared<C::Handle>, to: ConnectionState) {
        let from = shared.state;
        if from == to {
            return;
        }
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Unexpected connection state transition");
        }
        shared.state = to;
        match to {
            ConnectionState::Ready => info!("Database ready"),
            ConnectionState::Down => info!("Database down"),
            ConnectionState::Connecting => debug!("Database connecting"),
        }
        // No subscribers is fine.
        let _ = self.events.send(StateTransition { from, to });
    }

    /// Drop the current handle, if any, and go `DOWN`.
    async fn teardown(&self) {
        let handle = {
            let mut shared = self.lock_shared();
            let handle = shared.handle.take();
            self.transition(&mut shared, ConnectionState::Down);
            handle
        };
        if let Some(handle) = handle {
            self.connector.close(handle).await;
        }
    }

    /// Run the connect procedure. Caller must hold `connect_gate`.
    async fn connect_with_retry(&self, session: u64) -> StorageResult<()> {
        let attempts = self.config.attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            info!(attempt, attempts, "Connecting to database...");
            match self.attempt(session).await {
                Ok(handle) => return self.publish_ready(session, handle).await,
                Err(StorageError::ShutDown) => return Err(StorageError::ShutDown),
                Err(err) => {
                    info!(
                        attempt,
                        attempts,
                        error = %err,
                        "Attempt {}/{} to connect to database failed",
                        attempt,
                        attempts
                    );
                    last_error = err.to_string();
                    {
                        let mut shared = self.lock_shared();
                        if shared.session == session {
                            self.transition(&mut shared, ConnectionState::Down);
                        }
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_interval).await;
                    }
                }
            }
        }

        error!(attempts, error = %last_error, "Database connection retries exhausted");
        Err(StorageError::ConnectionExhausted {
            attempts,
            last_error,
        })
    }

    async fn attempt(&self, session: u64) -> StorageResult<C::Handle> {
        {
            let mut shared = self.lock_shared();
            if shared.session != session {
                return Err(StorageError::ShutDown);
            }
            self.transition(&mut shared, ConnectionState::Connecting);
        }
        let handle = self.connector.connect().await?;
        if let Err(err) = self.connector.ping(&handle).await {
            self.connector.close(handle).await;
            return Err(err);
        }
        Ok(handle)
    }

    /// Install the handle, go `READY` and wake every waiter in order.
    ///
    /// Registration in `await_ready` happens under the same lock, so a waiter
    /// either sees `READY` or is in the queue drained here.
    async fn publish_ready(&self, session: u64, handle: C::Handle) -> StorageResult<()> {
        let stale = {
            let mut shared = self.lock_shared();
            if shared.session == session {
                shared.handle = Some(handle.clone());
                shared.epoch += 1;
                self.transition(&mut shared, ConnectionState::Ready);
                let woken = shared.waiters.len();
                for waiter in shared.waiters.drain(..) {
                    // A dropped receiver means the caller stopped waiting.
                    let _ = waiter.send(handle.clone());
                }
                if woken > 0 {
                    debug!(woken, "Resolved readiness waiters");
                }
                None
            } else {
                Some(handle)
            }
        };
        match stale {
            None => Ok(()),
            Some(handle) => {
                self.connector.close(handle).await;
                Err(StorageError::ShutDown)
            }
        }
    }

    async fn probe_once(&self) {
        let (state, handle, epoch) = {
            let shared = self.lock_shared();
            (shared.state, shared.handle.clone(), shared.epoch)
        };
        match (state, handle) {
            (ConnectionState::Ready, Some(handle)) => {
                if let Err(err) = self.connector.ping(&handle).await {
                    warn!(error = %err, "Database liveness probe failed, reconnecting");
                    self.reconnect(Some(epoch)).await;
                }
            }
            // Down after exhausted retries, or Connecting left behind by a
            // cancelled attempt. A held gate means an attempt is in flight.
            _ => {
                if self.connect_gate.try_lock().is_err() {
                    return;
                }
                self.reconnect(None).await
            }
        }
    }

    async fn reconnect(&self, failed_epoch: Option<u64>) {
        let _gate = self.connect_gate.lock().await;
        let session = {
            let shared = self.lock_shared();
            let replaced = failed_epoch.map_or(true, |epoch| shared.epoch != epoch);
            if shared.state == ConnectionState::Ready && replaced {
                return;
            }
            shared.session
        };
        self.teardown().await;
        if let Err(err) = self.connect_with_retry(session).await {
            error!(error = %err, "Database reconnect failed, will retry on next probe");
        }
    }
}

async fn probe_loop<C: Connector>(inner: Weak<Inner<C>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.probe_once().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyConnector {
        failures_left: AtomicU32,
        connects: AtomicU32,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                connects: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Handle = u32;

        async fn connect(&self) -> StorageResult<u32> {
            let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
            let failed = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failed {
                return Err(StorageError::Connect("refused".to_string()));
            }
            Ok(n)
        }

        async fn ping(&self, _handle: &u32) -> StorageResult<()> {
            Ok(())
        }

        async fn close(&self, _handle: u32) {}
    }

    fn fast_config(retries: u32) -> LifecycleConfig {
        LifecycleConfig {
            connect_retries: retries,
            retry_interval: Duration::from_millis(1),
            probe_interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_transition_table() {
        use ConnectionState::*;
        assert!(Down.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Ready));
        assert!(Connecting.can_transition_to(Down));
        assert!(Ready.can_transition_to(Down));
        assert!(!Down.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Connecting));
    }

    #[tokio::test]
    async fn test_init_retries_until_ready() {
        let manager = ConnectionManager::new(FlakyConnector::new(2), fast_config(5));
        manager.init().await.unwrap();
        assert!(manager.is_ready());
        assert_eq!(manager.await_ready().await.unwrap(), 3);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_exhausts_budget() {
        let manager = ConnectionManager::new(FlakyConnector::new(10), fast_config(2));
        let err = manager.init().await.unwrap_err();
        assert!(matches!(err, StorageError::ConnectionExhausted { attempts: 3, .. }));
        assert_eq!(manager.state(), ConnectionState::Down);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let manager = ConnectionManager::new(FlakyConnector::new(0), fast_config(0));
        manager.shutdown().await;
        manager.init().await.unwrap();
        manager.shutdown().await;
        manager.shutdown().await;
        assert_eq!(manager.state(), ConnectionState::Down);
    }

    #[tokio::test]
    async fn test_failed_attempt_transitions_through_down() {
        let manager = ConnectionManager::new(FlakyConnector::new(1), fast_config(1));
        let mut events = manager.subscribe();
        manager.init().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push((event.from, event.to));
        }
        use ConnectionState::*;
        assert_eq!(
            seen,
            vec![(Down, Connecting), (Connecting, Down), (Down, Connecting), (Connecting, Ready)]
        );
        manager.shutdown().await;
    }
}

//! Connection lifecycle manager.
//!
//! # Responsibilities
//! - Track connection phase (Disconnected/Connecting/Connected)
//! - Serialize bring-up attempts (at most one in flight)
//! - Retry failed attempts up to `max_retries`, spaced by a fixed delay
//! - Expose a non-suspending health check for request middleware
//!
//! # Design Decisions
//! - Phase and retry counter are updated together under one mutex; the
//!   phase is mirrored into an atomic so health checks never take the lock
//! - A retry that exhausts the budget emits a terminal signal over a watch
//!   channel; the process entry point performs the actual exit
//! - Pending retries are never cancelled; on shutdown they fire into a
//!   dying process and are ignored

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::DatabaseConfig;
use crate::db::driver::{StoreDriver, StoreEvent};
use crate::db::DbError;
use crate::observability::metrics;

/// Connection phase. Exactly one holds at any instant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl From<u8> for ConnectionPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionPhase::Connecting,
            2 => ConnectionPhase::Connected,
            _ => ConnectionPhase::Disconnected,
        }
    }
}

/// Point-in-time view of the connection state, reported by `/health`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConnectionSnapshot {
    pub phase: ConnectionPhase,
    pub retry_count: u32,
}

/// Phase and retry counter, mutated together under the state mutex.
struct ConnState {
    phase: ConnectionPhase,
    retry_count: u32,
}

/// Supervises the single shared store connection.
///
/// Created once at startup, shared via `Arc` with the startup sequence and
/// the request middleware. The manager is the only writer of the
/// connection state; arbitrary request flows read it through
/// [`ConnectionManager::is_healthy`].
pub struct ConnectionManager {
    driver: Arc<dyn StoreDriver>,
    max_retries: u32,
    retry_delay: Duration,
    /// Single-writer state; pair updates happen under this lock.
    state: Mutex<ConnState>,
    /// Mirror of `state.phase` for lock-free health checks.
    phase: AtomicU8,
    /// Raised once when the retry budget is exhausted.
    fatal_tx: watch::Sender<bool>,
}

impl ConnectionManager {
    /// Create a manager over the given driver.
    pub fn new(driver: Arc<dyn StoreDriver>, config: &DatabaseConfig) -> Self {
        let (fatal_tx, _) = watch::channel(false);
        Self {
            driver,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            state: Mutex::new(ConnState {
                phase: ConnectionPhase::Disconnected,
                retry_count: 0,
            }),
            phase: AtomicU8::new(ConnectionPhase::Disconnected as u8),
            fatal_tx,
        }
    }

    /// Establish the store connection.
    ///
    /// Idempotent: a call while Connected or Connecting is a logged no-op.
    /// A failed attempt schedules another call after the fixed retry delay
    /// and returns `Ok`; only retry exhaustion surfaces an error, and the
    /// same condition is raised on the fatal watch channel for callers that
    /// only observe the signal.
    pub fn connect(
        self: &Arc<Self>,
    ) -> Pin<Box<dyn Future<Output = Result<(), DbError>> + Send + '_>> {
        Box::pin(async move {
        {
            let mut state = self.lock_state();
            match state.phase {
                ConnectionPhase::Connected => {
                    tracing::debug!("using existing store connection");
                    return Ok(());
                }
                ConnectionPhase::Connecting => {
                    tracing::debug!("store connection attempt already in progress");
                    return Ok(());
                }
                ConnectionPhase::Disconnected => {
                    self.set_phase(&mut state, ConnectionPhase::Connecting);
                }
            }
        }

        tracing::info!("connecting to store");

        match self.driver.attempt_connect().await {
            Ok(()) => {
                let mut state = self.lock_state();
                self.set_phase(&mut state, ConnectionPhase::Connected);
                state.retry_count = 0;
                tracing::info!("store connected");
                Ok(())
            }
            Err(err) => {
                let retry_count = {
                    let mut state = self.lock_state();
                    self.set_phase(&mut state, ConnectionPhase::Disconnected);
                    state.retry_count += 1;
                    state.retry_count
                };

                if retry_count < self.max_retries {
                    tracing::warn!(
                        error = %err,
                        retry = retry_count,
                        max_retries = self.max_retries,
                        delay_ms = self.retry_delay.as_millis() as u64,
                        "store connection failed, retry scheduled"
                    );
                    let manager = Arc::clone(self);
                    tokio::spawn(async move {
                        tokio::time::sleep(manager.retry_delay).await;
                        let _ = manager.connect().await;
                    });
                    Ok(())
                } else {
                    tracing::error!(
                        error = %err,
                        attempts = retry_count,
                        "store connection retries exhausted"
                    );
                    let _ = self.fatal_tx.send(true);
                    Err(DbError::RetriesExhausted {
                        attempts: retry_count,
                    })
                }
            }
        }
        })
    }

    /// True iff the connection is established. Lock-free, never suspends,
    /// never mutates state.
    pub fn is_healthy(&self) -> bool {
        ConnectionPhase::from(self.phase.load(Ordering::Relaxed)) == ConnectionPhase::Connected
    }

    /// Typed health check for request middleware.
    ///
    /// Callers must translate the error into a service-unavailable
    /// response rather than propagate it as a crash.
    pub fn check_connection(&self) -> Result<(), DbError> {
        if self.is_healthy() {
            Ok(())
        } else {
            Err(DbError::NotConnected)
        }
    }

    /// Current phase and retry counter.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let state = self.lock_state();
        ConnectionSnapshot {
            phase: state.phase,
            retry_count: state.retry_count,
        }
    }

    /// Receiver that flips to `true` when the retry budget is exhausted.
    /// The process entry point turns this into a non-zero exit.
    pub fn fatal_signal(&self) -> watch::Receiver<bool> {
        self.fatal_tx.subscribe()
    }

    /// Subscribe to driver signals and apply them to the state machine.
    ///
    /// Called once at startup. Signals arriving outside an active
    /// `connect()` call only mark state; they never start a retry loop.
    pub fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.driver.subscribe();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => manager.apply_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "store event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn apply_event(&self, event: StoreEvent) {
        let mut state = self.lock_state();
        let previous = state.phase;
        match event {
            StoreEvent::Connected => {
                self.set_phase(&mut state, ConnectionPhase::Connected);
                state.retry_count = 0;
                if previous != ConnectionPhase::Connected {
                    tracing::info!("store signalled connected");
                }
            }
            StoreEvent::Error(message) => {
                self.set_phase(&mut state, ConnectionPhase::Disconnected);
                tracing::error!(error = %message, "store connection error");
            }
            StoreEvent::Disconnected => {
                self.set_phase(&mut state, ConnectionPhase::Disconnected);
                if previous != ConnectionPhase::Disconnected {
                    tracing::warn!("store disconnected");
                }
            }
        }
    }

    fn set_phase(&self, state: &mut ConnState, phase: ConnectionPhase) {
        state.phase = phase;
        self.phase.store(phase as u8, Ordering::Relaxed);
        metrics::record_store_connected(phase == ConnectionPhase::Connected);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ConnState> {
        self.state.lock().expect("connection state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;

    fn test_config(max_retries: u32) -> DatabaseConfig {
        DatabaseConfig {
            max_retries,
            retry_delay_ms: 5000,
            ..DatabaseConfig::default()
        }
    }

    /// Scripted driver: pops one outcome per attempt, succeeds once the
    /// script runs dry. An optional delay keeps an attempt in flight so
    /// re-entry can be observed.
    struct MockDriver {
        outcomes: Mutex<VecDeque<Result<(), DbError>>>,
        attempts: AtomicU32,
        delay: Option<Duration>,
        events: broadcast::Sender<StoreEvent>,
    }

    impl MockDriver {
        fn scripted(outcomes: Vec<Result<(), DbError>>) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: AtomicU32::new(0),
                delay: None,
                events,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                outcomes: Mutex::new(VecDeque::new()),
                attempts: AtomicU32::new(0),
                delay: Some(delay),
                events,
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }

        fn emit(&self, event: StoreEvent) {
            let _ = self.events.send(event);
        }
    }

    #[async_trait]
    impl StoreDriver for MockDriver {
        async fn attempt_connect(&self) -> Result<(), DbError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
            self.events.subscribe()
        }
    }

    fn failure() -> Result<(), DbError> {
        Err(DbError::Store("connection refused".into()))
    }

    #[tokio::test]
    async fn successful_connect_is_healthy_with_zero_retries() {
        let driver = MockDriver::scripted(vec![Ok(())]);
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));

        manager.connect().await.unwrap();

        assert!(manager.is_healthy());
        assert!(manager.check_connection().is_ok());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, ConnectionPhase::Connected);
        assert_eq!(snapshot.retry_count, 0);
        assert_eq!(driver.attempts(), 1);
    }

    #[tokio::test]
    async fn connect_when_connected_is_a_noop() {
        let driver = MockDriver::scripted(vec![Ok(())]);
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));

        manager.connect().await.unwrap();
        manager.connect().await.unwrap();

        assert_eq!(driver.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_while_connecting_is_a_noop() {
        let driver = MockDriver::slow(Duration::from_secs(1));
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));

        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.connect().await }
        });

        // Let the first attempt get in flight, then re-enter.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.snapshot().phase, ConnectionPhase::Connecting);
        manager.connect().await.unwrap();
        assert_eq!(driver.attempts(), 1);
        assert_eq!(manager.snapshot().phase, ConnectionPhase::Connecting);

        first.await.unwrap().unwrap();
        assert!(manager.is_healthy());
        assert_eq!(driver.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_schedules_retry_after_fixed_delay() {
        let driver = MockDriver::scripted(vec![failure(), Ok(())]);
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));

        manager.connect().await.unwrap();

        assert!(!manager.is_healthy());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, ConnectionPhase::Disconnected);
        assert_eq!(snapshot.retry_count, 1);

        // Just short of the retry delay nothing has fired yet.
        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(driver.attempts(), 1);
        assert!(!manager.is_healthy());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(driver.attempts(), 2);
        assert!(manager.is_healthy());
        assert_eq!(manager.snapshot().retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_failures_resets_retry_count() {
        let driver = MockDriver::scripted(vec![failure(), failure(), Ok(())]);
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));

        manager.connect().await.unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(driver.attempts(), 3);
        assert!(manager.is_healthy());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, ConnectionPhase::Connected);
        assert_eq!(snapshot.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_raise_the_fatal_signal() {
        let driver = MockDriver::scripted((0..5).map(|_| failure()).collect());
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));
        let mut fatal = manager.fatal_signal();

        manager.connect().await.unwrap();

        // Four failures in: one attempt plus three retries have fired and
        // a fifth attempt is pending.
        tokio::time::sleep(Duration::from_millis(15_100)).await;
        assert_eq!(driver.attempts(), 4);
        assert_eq!(manager.snapshot().retry_count, 4);
        assert!(!*fatal.borrow());

        // The fifth failure is terminal.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(driver.attempts(), 5);
        fatal.changed().await.unwrap();
        assert!(*fatal.borrow());

        // No further attempt is ever scheduled.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(driver.attempts(), 5);
        assert!(!manager.is_healthy());
    }

    #[tokio::test]
    async fn check_connection_fails_when_disconnected() {
        let driver = MockDriver::scripted(vec![]);
        let manager = Arc::new(ConnectionManager::new(driver, &test_config(5)));

        assert!(!manager.is_healthy());
        assert!(matches!(
            manager.check_connection(),
            Err(DbError::NotConnected)
        ));
        // The failed check did not disturb the state.
        assert_eq!(manager.snapshot().phase, ConnectionPhase::Disconnected);
        assert_eq!(manager.snapshot().retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_events_mark_state_without_retrying() {
        let driver = MockDriver::scripted(vec![Ok(())]);
        let manager = Arc::new(ConnectionManager::new(driver.clone(), &test_config(5)));
        let listener = manager.spawn_event_listener();

        manager.connect().await.unwrap();
        assert!(manager.is_healthy());

        driver.emit(StoreEvent::Disconnected);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!manager.is_healthy());

        driver.emit(StoreEvent::Connected);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_healthy());
        assert_eq!(manager.snapshot().retry_count, 0);

        // An error outside an active connect() marks state only; no retry
        // attempt is initiated on the driver.
        driver.emit(StoreEvent::Error("reset by peer".into()));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!manager.is_healthy());
        assert_eq!(driver.attempts(), 1);

        listener.abort();
    }
}

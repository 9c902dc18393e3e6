//! Store driver capability interface.
//!
//! # Responsibilities
//! - Abstract the concrete database client behind a minimal surface
//! - Expose the driver's connection signals as an event stream
//!
//! The manager subscribes to the event stream once at startup and owns
//! every state transition; drivers only report what happened.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::db::DbError;

/// Connection signals emitted by the underlying store client on its own
/// schedule, independent of any in-flight `connect()` call.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The client established (or re-established) a usable connection.
    Connected,
    /// The client reported a connection-level error.
    Error(String),
    /// The client lost its connection.
    Disconnected,
}

/// Capability interface over the backing store client.
///
/// The production implementation is [`crate::db::MongoStore`]; tests use a
/// scripted mock so the manager's policy is exercised without a real store.
#[async_trait]
pub trait StoreDriver: Send + Sync + 'static {
    /// Run a single connection attempt to completion.
    ///
    /// The attempt is bounded by the driver's own timeouts (server
    /// selection, connect); the manager imposes no timeout of its own.
    async fn attempt_connect(&self) -> Result<(), DbError>;

    /// Subscribe to the driver's connection signals.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

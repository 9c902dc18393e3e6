//! Store connection supervision.
//!
//! # Responsibilities
//! - Own the lifecycle of the single shared MongoDB connection
//! - Gate inbound requests on connection health
//! - Retry failed bring-up attempts with a bounded count and fixed delay
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connect() begins an attempt
//! Connecting → Connected: attempt succeeds / driver signals connected
//! Connecting → Disconnected: attempt fails / driver signals error
//! Connected → Disconnected: driver signals error or disconnected
//! ```
//!
//! # Design Decisions
//! - One writer (the manager); health checks are lock-free reads
//! - Retry loop governs initial bring-up only; an established connection
//!   relies on the driver's own recovery and the event stream
//! - Retry exhaustion surfaces as a terminal signal the process entry
//!   point turns into a non-zero exit

pub mod driver;
pub mod manager;
pub mod mongo;

pub use driver::{StoreDriver, StoreEvent};
pub use manager::{ConnectionManager, ConnectionPhase};
pub use mongo::MongoStore;

use thiserror::Error;

/// Error type for store connection operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The health check failed; the connection is not in the Connected phase.
    /// Request middleware translates this into a 503 response.
    #[error("database connection not established")]
    NotConnected,

    /// A single connection attempt failed. Recovered by the retry loop
    /// while attempts remain.
    #[error("store error: {0}")]
    Store(String),

    /// The bounded retry sequence ran out without ever connecting.
    #[error("store connection retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

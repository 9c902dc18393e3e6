//! Real-time order updates over WebSocket.
//!
//! # Data Flow
//! ```text
//! PUT /api/orders/{id}/status ──▶ broadcast channel ──▶ every /ws client
//! client orderStatusUpdate ─────▶ broadcast channel ──▶ every /ws client
//! ```

pub mod broadcast;
pub mod ws;

pub use broadcast::{broadcast_event, OrderEvent, OrderEventSender};

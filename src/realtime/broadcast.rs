//! Order-event broadcasting.
//!
//! Events fan out through `tokio::sync::broadcast`; every connected
//! WebSocket client holds a receiver. Senders are cheap to clone and live
//! in the shared application state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::store::models::OrderStatus;

/// Broadcast sender for order events.
pub type OrderEventSender = broadcast::Sender<OrderEvent>;

/// Event pushed to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    /// An order moved to a new status.
    #[serde(rename = "orderStatusChanged")]
    StatusChanged {
        #[serde(rename = "orderId")]
        order_id: String,
        status: OrderStatus,
    },
}

/// Broadcast an event to all subscribers.
///
/// Returns the number of subscribers that received it; zero subscribers
/// is not an error.
pub fn broadcast_event(sender: &OrderEventSender, event: OrderEvent) -> usize {
    match sender.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!(subscribers = subscriber_count, "order event broadcast");
            subscriber_count
        }
        Err(_) => 0,
    }
}

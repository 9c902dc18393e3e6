//! WebSocket endpoint for order updates.
//!
//! # Responsibilities
//! - Upgrade `/ws` requests and register the client on the broadcast bus
//! - Push every order event to the socket as JSON
//! - Re-broadcast client `orderStatusUpdate` messages as
//!   `orderStatusChanged` events
//!
//! The endpoint sits outside the store-availability guard: a client can
//! stay subscribed while the store is down.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::http::server::AppState;
use crate::realtime::broadcast::{broadcast_event, OrderEvent, OrderEventSender};
use crate::store::models::OrderStatus;

/// Messages accepted from clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "orderStatusUpdate")]
    OrderStatusUpdate {
        #[serde(rename = "orderId")]
        order_id: String,
        status: OrderStatus,
    },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let events = state.orders_tx.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(socket: WebSocket, events: OrderEventSender) {
    let client_id = Uuid::new_v4();
    tracing::info!(client = %client_id, "realtime client connected");

    let (mut sink, mut stream) = socket.split();
    let mut updates = events.subscribe();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(error) => {
                            tracing::error!(error = %error, "failed to encode order event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(client = %client_id, missed, "realtime client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(client_id, text.as_str(), &events);
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong is answered by the protocol layer.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::debug!(client = %client_id, error = %error, "realtime read error");
                    break;
                }
            },
        }
    }

    tracing::info!(client = %client_id, "realtime client disconnected");
}

fn handle_client_message(client_id: Uuid, text: &str, events: &OrderEventSender) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::OrderStatusUpdate { order_id, status }) => {
            broadcast_event(events, OrderEvent::StatusChanged { order_id, status });
        }
        Err(error) => {
            tracing::debug!(client = %client_id, error = %error, "ignoring malformed message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_parses_the_update_shape() {
        let parsed: ClientMessage = serde_json::from_str(
            r#"{"type":"orderStatusUpdate","orderId":"6567aa0000000000000000ab","status":"shipped"}"#,
        )
        .unwrap();
        let ClientMessage::OrderStatusUpdate { order_id, status } = parsed;
        assert_eq!(order_id, "6567aa0000000000000000ab");
        assert_eq!(status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn client_update_is_rebroadcast() {
        let (tx, mut rx) = broadcast::channel(16);

        handle_client_message(
            Uuid::new_v4(),
            r#"{"type":"orderStatusUpdate","orderId":"abc","status":"delivered"}"#,
            &tx,
        );

        let OrderEvent::StatusChanged { order_id, status } = rx.recv().await.unwrap();
        assert_eq!(order_id, "abc");
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped() {
        let (tx, mut rx) = broadcast::channel::<OrderEvent>(16);

        handle_client_message(Uuid::new_v4(), "not json", &tx);

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}

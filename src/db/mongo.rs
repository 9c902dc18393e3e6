//! MongoDB-backed store driver.
//!
//! # Responsibilities
//! - Build client options from configuration (timeouts, app name)
//! - Verify connectivity with a `ping` round-trip per attempt
//! - Forward the driver's SDAM signals as [`StoreEvent`]s
//!
//! The client itself connects lazily; recovery of an established
//! connection is left to the driver's own monitoring, surfaced to the
//! manager through the event stream.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::event::sdam::SdamEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::sync::broadcast;

use crate::config::DatabaseConfig;
use crate::db::driver::{StoreDriver, StoreEvent};
use crate::db::DbError;

/// Database used when the connection string names none.
const FALLBACK_DATABASE: &str = "ziply";

const EVENT_BUFFER: usize = 16;

/// The production [`StoreDriver`] over the official MongoDB client.
pub struct MongoStore {
    client: Client,
    database: Database,
    events: broadcast::Sender<StoreEvent>,
}

impl MongoStore {
    /// Build the client from configuration. No I/O happens here beyond
    /// parsing the connection string; the first round-trip is the ping in
    /// [`StoreDriver::attempt_connect`].
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let mut options = Self::client_options(config).await?;
        options.sdam_event_handler = Some(Self::sdam_handler(events.clone()));

        let client = Client::with_options(options).map_err(|e| DbError::Store(e.to_string()))?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));

        tracing::info!(database = %database.name(), "store client initialized");

        Ok(Self {
            client,
            database,
            events,
        })
    }

    /// Handle to the selected database for collection access.
    pub fn database(&self) -> Database {
        self.database.clone()
    }

    /// Clone of the underlying client, used for the shutdown handshake.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    async fn client_options(config: &DatabaseConfig) -> Result<ClientOptions, DbError> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DbError::Store(e.to_string()))?;

        options.app_name = Some("ziply-server".to_string());
        options.server_selection_timeout =
            Some(Duration::from_millis(config.server_selection_timeout_ms));
        // Close pooled sockets idle past the configured window.
        options.max_idle_time = Some(Duration::from_millis(config.socket_idle_timeout_ms));

        Ok(options)
    }

    fn sdam_handler(events: broadcast::Sender<StoreEvent>) -> EventHandler<SdamEvent> {
        EventHandler::callback(move |event: SdamEvent| {
            let signal = match event {
                SdamEvent::ServerHeartbeatSucceeded(_) => Some(StoreEvent::Connected),
                SdamEvent::ServerHeartbeatFailed(ev) => {
                    Some(StoreEvent::Error(ev.failure.to_string()))
                }
                SdamEvent::ServerClosed(_) => Some(StoreEvent::Disconnected),
                _ => None,
            };
            if let Some(signal) = signal {
                // Send fails only when no listener is attached yet.
                let _ = events.send(signal);
            }
        })
    }
}

#[async_trait]
impl StoreDriver for MongoStore {
    async fn attempt_connect(&self) -> Result<(), DbError> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DbError::Store(e.to_string()))?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_options_apply_configured_timeouts() {
        let config = DatabaseConfig::default();
        let options = MongoStore::client_options(&config).await.unwrap();

        assert_eq!(
            options.server_selection_timeout,
            Some(Duration::from_millis(5_000))
        );
        assert_eq!(options.max_idle_time, Some(Duration::from_millis(45_000)));
        assert_eq!(options.app_name.as_deref(), Some("ziply-server"));
    }
}

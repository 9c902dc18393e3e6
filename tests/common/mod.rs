//! Shared utilities for integration testing.
//!
//! Servers run on ephemeral ports against a store client pointed at an
//! unused local port, so no real database is needed: the disconnected
//! manager exercises the gating path, and a force-connected manager lets
//! requests through to observe downstream failure handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use ziply_server::config::ServerConfig;
use ziply_server::db::{ConnectionManager, DbError, MongoStore, StoreDriver, StoreEvent};
use ziply_server::http::HttpServer;
use ziply_server::store::Store;

/// Driver whose attempts always succeed without touching a database.
/// Pushes the manager into the Connected phase so the guard opens.
pub struct AlwaysUpDriver {
    events: broadcast::Sender<StoreEvent>,
}

impl AlwaysUpDriver {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self { events }
    }
}

#[async_trait]
impl StoreDriver for AlwaysUpDriver {
    async fn attempt_connect(&self) -> Result<(), DbError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    // Nothing listens here; store round-trips fail fast.
    config.database.uri = "mongodb://127.0.0.1:59999/ziply-test".into();
    config.database.server_selection_timeout_ms = 200;
    config
}

/// Spawn a server. With `store_connected` the manager is forced healthy
/// (requests pass the guard and hit the unreachable store); without it
/// the manager stays in the Disconnected phase.
pub async fn spawn_server(store_connected: bool) -> SocketAddr {
    let config = test_config();

    let mongo = MongoStore::new(&config.database)
        .await
        .expect("store client");
    let store = Store::new(mongo.database());

    let manager = if store_connected {
        let manager = Arc::new(ConnectionManager::new(
            Arc::new(AlwaysUpDriver::new()),
            &config.database,
        ));
        manager.connect().await.expect("mock connect");
        manager
    } else {
        Arc::new(ConnectionManager::new(Arc::new(mongo), &config.database))
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, manager, store);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    // Give the acceptor a beat to come up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    addr
}

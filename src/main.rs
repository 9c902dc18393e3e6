//! Binary entry point.
//!
//! Startup order matters: the store connection is brought up before the
//! listener binds, and the manager's terminal failure signal is what
//! turns retry exhaustion into a non-zero process exit.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ziply_server::config;
use ziply_server::db::{ConnectionManager, MongoStore};
use ziply_server::http::HttpServer;
use ziply_server::observability::metrics;
use ziply_server::store::Store;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ziply_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ziply-server v0.1.0 starting");

    let config = match config::load() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(error = %error, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_retries = config.database.max_retries,
        retry_delay_ms = config.database.retry_delay_ms,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let mongo = match MongoStore::new(&config.database).await {
        Ok(mongo) => mongo,
        Err(error) => {
            tracing::error!(error = %error, "failed to initialize store client");
            return ExitCode::FAILURE;
        }
    };
    let store = Store::new(mongo.database());
    let client = mongo.client();

    let manager = Arc::new(ConnectionManager::new(Arc::new(mongo), &config.database));
    let mut fatal = manager.fatal_signal();
    manager.spawn_event_listener();

    // First connect to the database, then start the server. A failed
    // first attempt is not fatal here; the retry schedule owns it.
    tracing::info!("connecting to database");
    if let Err(error) = manager.connect().await {
        tracing::error!(error = %error, "could not establish store connection");
        return ExitCode::FAILURE;
    }

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(
                error = %error,
                bind_address = %config.listener.bind_address,
                "failed to bind listener"
            );
            return ExitCode::FAILURE;
        }
    };

    let server = HttpServer::new(config, Arc::clone(&manager), store);

    tokio::select! {
        result = server.run(listener) => {
            if let Err(error) = result {
                tracing::error!(error = %error, "server error");
                return ExitCode::FAILURE;
            }
        }
        _ = fatal.wait_for(|exhausted| *exhausted) => {
            tracing::error!("store connection retries exhausted, exiting");
            return ExitCode::FAILURE;
        }
    }

    client.shutdown().await;
    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}

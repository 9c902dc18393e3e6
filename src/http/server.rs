//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, CORS, store gate)
//! - Serve the client build when static serving is enabled
//! - Run with graceful shutdown

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_status::SetStatus;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{CorsConfig, ServerConfig, StaticFilesConfig};
use crate::db::ConnectionManager;
use crate::http::middleware::db_guard;
use crate::observability::metrics;
use crate::realtime::{self, OrderEventSender};
use crate::routes;
use crate::store::Store;

const ORDER_EVENT_BUFFER: usize = 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Arc<ConnectionManager>,
    pub store: Store,
    pub orders_tx: OrderEventSender,
}

/// HTTP server for the API, realtime endpoint, and client assets.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, db: Arc<ConnectionManager>, store: Store) -> Self {
        let (orders_tx, _) = broadcast::channel(ORDER_EVENT_BUFFER);
        let state = AppState {
            config: Arc::new(config),
            db,
            store,
            orders_tx,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        // Everything under /api is gated on store availability; /ws and
        // /health stay reachable while the store is down.
        let api = Router::new()
            .nest("/auth", routes::auth::router())
            .nest("/products", routes::products::router())
            .nest("/orders", routes::orders::router())
            .nest("/users", routes::users::router())
            .layer(middleware::from_fn_with_state(
                state.clone(),
                db_guard::require_store,
            ));

        let config = Arc::clone(&state.config);

        let mut app = Router::new()
            .nest("/api", api)
            .route("/ws", get(realtime::ws::ws_handler))
            .route("/health", get(routes::health::health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            // Propagate sits inside Set so the generated id is on the
            // request by the time it is copied to the response.
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.cors))
            .layer(middleware::from_fn(record_metrics));

        if config.static_files.enabled {
            app = app.fallback_service(static_service(&config.static_files));
        }

        app
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origin == "*" {
        return layer.allow_origin(Any);
    }
    match config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(
                origin = %config.allowed_origin,
                "invalid allowed_origin, falling back to any origin"
            );
            layer.allow_origin(Any)
        }
    }
}

/// Client build with `index.html` fallback for client-side routing.
/// MIME types come from the file extension via `ServeDir`.
fn static_service(config: &StaticFilesConfig) -> ServeDir<SetStatus<ServeFile>> {
    let index = Path::new(&config.dir).join("index.html");
    ServeDir::new(&config.dir).not_found_service(ServeFile::new(index))
}

async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}

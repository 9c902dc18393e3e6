//! Liveness/readiness endpoint.
//!
//! Reports the connection snapshot; answers 503 while the store is not
//! connected so external probes see the same availability the API
//! middleware enforces.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::http::server::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.db.snapshot();
    let healthy = state.db.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "database": snapshot,
        })),
    )
}

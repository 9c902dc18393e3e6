//! Store-availability gate for API requests.
//!
//! Every `/api` request passes through here before reaching business
//! logic. The check is a synchronous state read; a failed check becomes a
//! 503 response and never a crash of the request flow.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::error::ApiError;
use crate::http::server::AppState;

pub async fn require_store(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.db.check_connection() {
        Ok(()) => next.run(request).await,
        Err(error) => {
            tracing::warn!(
                error = %error,
                method = %request.method(),
                path = %request.uri().path(),
                "rejecting request, store unavailable"
            );
            ApiError::StoreUnavailable.into_response()
        }
    }
}

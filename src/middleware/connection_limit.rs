//! Concurrent call limiting for the media stream endpoint.
//!
//! Applies only to WebSocket upgrade requests; plain HTTP passes through.
//! The acquired [`CallSlot`] rides the request as an extension and releases
//! itself on drop, so an upgrade the handler refuses cannot leak a slot.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::state::{AppState, CallLimitError};

/// Middleware that enforces the concurrent call limit.
///
/// Returns 503 Service Unavailable when the gateway is already bridging its
/// configured maximum number of calls. Admitted upgrades carry a
/// [`CallSlot`](crate::state::CallSlot) extension; the media stream handler
/// holds it for the duration of the call.
pub async fn call_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let is_ws_upgrade = request
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_ws_upgrade {
        return next.run(request).await;
    }

    match state.try_acquire_call() {
        Ok(slot) => {
            request.extensions_mut().insert(slot);
            next.run(request).await
        }
        Err(CallLimitError::LimitReached) => {
            tracing::warn!(
                active = state.active_call_count(),
                "rejecting call: concurrent call limit reached"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
    }
}

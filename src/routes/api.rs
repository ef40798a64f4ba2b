//! HTTP route configuration.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{api, voice};
use crate::state::AppState;

/// Create the HTTP router.
///
/// # Endpoints
///
/// - `GET /health` - liveness check
/// - `POST /voice` - telephony voice webhook, answers with TwiML
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/voice", post(voice::voice_webhook))
        .layer(TraceLayer::new_for_http())
}

//! Media stream WebSocket route configuration.
//!
//! # Endpoint
//!
//! `GET /twilio-media-stream` - WebSocket upgrade for the telephony media
//! stream. The voice webhook points the provider here; one connection is one
//! bridged call. The optional `to` query parameter carries the dialled
//! number so the bridge resolves the right business configuration.

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;

/// Create the media stream WebSocket router.
///
/// The concurrent call limit middleware is applied in main.rs once state is
/// available.
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/twilio-media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}

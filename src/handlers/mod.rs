//! HTTP and WebSocket request handlers.

pub mod api;
pub mod media_stream;
pub mod voice;

pub use api::health_check;
pub use media_stream::media_stream_handler;
pub use voice::voice_webhook;

//! OpenAI Realtime API backend.

pub mod client;
pub mod config;
pub mod messages;

pub use client::{RealtimeSession, RealtimeSessionConfig};
pub use config::{OPENAI_REALTIME_URL, RealtimeModel, RealtimeVoice, TELEPHONY_AUDIO_FORMAT};
pub use messages::{
    ClientEvent, RealtimeCodecError, RealtimeEvent, ResponseConfig, SessionConfig, ToolDef,
    TurnDetection, decode_server_event,
};

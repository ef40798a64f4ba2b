//! Realtime AI session handling.
//!
//! `base` holds the lifecycle machine and subscriber hooks, `buffer` the
//! pre-handshake audio staging, `turn` the single-response gate, and `openai`
//! the concrete backend client and wire protocol.

pub mod base;
pub mod buffer;
pub mod openai;
pub mod turn;

pub use base::{
    AudioSubscriber, LeadSubscriber, RealtimeError, RealtimeResult, SessionHooks, SessionState,
    SessionStateCell,
};
pub use buffer::PendingAudio;
pub use turn::TurnGate;

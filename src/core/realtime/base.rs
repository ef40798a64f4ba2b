//! Base types for the realtime AI session: lifecycle states, subscriber
//! hooks and the error taxonomy.
//!
//! The session lifecycle is a strict one-way machine, `Pending -> Open ->
//! Closed`. All transitions go through [`SessionStateCell::transition`], which
//! rejects anything else, so illegal moves (reopening a closed session, audio
//! after close) are structurally impossible rather than silently tolerated.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::core::lead::LeadRecord;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the realtime session side of the bridge.
///
/// None of these are fatal to the process; the unit of failure isolation is a
/// single call.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Backend rejected or never acknowledged the connection handshake
    #[error("realtime handshake failed: {0}")]
    Handshake(String),

    /// Send attempted on a connection that is already closed
    #[error("send attempted on closed realtime connection")]
    TransportClosed,

    /// WebSocket-level failure
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A state transition the lifecycle machine forbids
    #[error("illegal session transition {from} -> {to}")]
    IllegalTransition {
        /// State the session was in
        from: SessionState,
        /// State the caller asked for
        to: SessionState,
    },

    /// Invalid session configuration
    #[error("invalid session configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for realtime session operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Session Lifecycle
// =============================================================================

/// Lifecycle state of one realtime AI session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connection opening; handshake acknowledgment not yet received
    #[default]
    Pending,
    /// Handshake complete, session configuration pushed, audio flowing
    Open,
    /// Connection closed; terminal
    Closed,
}

impl SessionState {
    /// Whether the machine permits advancing from `self` to `next`.
    fn can_advance(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Pending, SessionState::Open)
                | (SessionState::Pending, SessionState::Closed)
                | (SessionState::Open, SessionState::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => write!(f, "Pending"),
            SessionState::Open => write!(f, "Open"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Shared holder for the session state with a single authoritative
/// transition function.
#[derive(Debug, Default)]
pub struct SessionStateCell {
    inner: RwLock<SessionState>,
}

impl SessionStateCell {
    /// New cell starting in [`SessionState::Pending`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> SessionState {
        *self.inner.read()
    }

    /// Advance to `to`.
    ///
    /// Returns `Ok(true)` when the transition was applied, `Ok(false)` when
    /// the session is already in `to` (idempotent no-op), and an error for
    /// any back-transition.
    pub fn transition(&self, to: SessionState) -> RealtimeResult<bool> {
        let mut state = self.inner.write();
        if *state == to {
            return Ok(false);
        }
        if !state.can_advance(to) {
            return Err(RealtimeError::IllegalTransition { from: *state, to });
        }
        *state = to;
        Ok(true)
    }
}

// =============================================================================
// Subscriber Hooks
// =============================================================================

/// Subscriber for audio chunks produced by the model (base64 payloads).
pub type AudioSubscriber =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Subscriber for captured lead records.
pub type LeadSubscriber =
    Arc<dyn Fn(LeadRecord) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Typed per-session subscriber registry.
///
/// Each event kind carries an ordered list of subscribers, scoped to one
/// session's lifetime. Hooks are attached before the session opens, so no
/// event can fire into an empty registry by accident.
#[derive(Default, Clone)]
pub struct SessionHooks {
    audio: Vec<AudioSubscriber>,
    lead: Vec<LeadSubscriber>,
}

impl SessionHooks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an audio subscriber.
    pub fn on_audio(mut self, subscriber: AudioSubscriber) -> Self {
        self.audio.push(subscriber);
        self
    }

    /// Append a lead subscriber.
    pub fn on_lead(mut self, subscriber: LeadSubscriber) -> Self {
        self.lead.push(subscriber);
        self
    }

    /// Fan an audio chunk out to all subscribers, in registration order.
    pub(crate) async fn emit_audio(&self, chunk: &str) {
        for subscriber in &self.audio {
            subscriber(chunk.to_string()).await;
        }
    }

    /// Fan a lead record out to all subscribers, in registration order.
    pub(crate) async fn emit_lead(&self, lead: &LeadRecord) {
        for subscriber in &self.lead {
            subscriber(lead.clone()).await;
        }
    }
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHooks")
            .field("audio_subscribers", &self.audio.len())
            .field("lead_subscribers", &self.lead.len())
            .finish()
    }
}

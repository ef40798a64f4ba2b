//! OpenAI Realtime websocket session.
//!
//! [`RealtimeSession::start`] connects eagerly in a background task so the
//! caller hears the assistant as early as possible. Audio arriving before the
//! handshake completes is staged in a [`PendingAudio`] buffer and flushed, in
//! order, right after the session configuration frame. Turn starts are
//! serialized through a [`TurnGate`] keyed off the backend's terminal events.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::core::lead::{LEAD_TOOL_NAME, LeadRecord};
use crate::core::realtime::base::{SessionHooks, SessionState, SessionStateCell};
use crate::core::realtime::buffer::PendingAudio;
use crate::core::realtime::turn::TurnGate;

use super::config::{OPENAI_REALTIME_URL, RealtimeModel, RealtimeVoice, TELEPHONY_AUDIO_FORMAT};
use super::messages::{
    ClientEvent, RealtimeEvent, ResponseConfig, SessionConfig, ToolDef, TurnDetection,
    decode_server_event,
};

/// Outbound event channel capacity per session.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Configuration for one realtime session.
#[derive(Debug, Clone)]
pub struct RealtimeSessionConfig {
    /// API key for the backend
    pub api_key: String,
    /// Model to use
    pub model: RealtimeModel,
    /// Voice for audio output
    pub voice: RealtimeVoice,
    /// System instructions for the assistant
    pub instructions: String,
    /// Tools exposed to the model
    pub tools: Vec<ToolDef>,
    /// Idle timeout after which a stale in-flight turn is reclaimed
    pub turn_timeout: Option<Duration>,
    /// Websocket endpoint; overridable for tests
    pub endpoint: String,
}

impl RealtimeSessionConfig {
    /// New config against the production endpoint.
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: RealtimeModel::default(),
            voice: RealtimeVoice::default(),
            instructions: String::new(),
            tools: Vec::new(),
            turn_timeout: None,
            endpoint: OPENAI_REALTIME_URL.to_string(),
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: self.instructions.clone(),
            voice: self.voice.as_str().to_string(),
            input_audio_format: TELEPHONY_AUDIO_FORMAT.to_string(),
            output_audio_format: TELEPHONY_AUDIO_FORMAT.to_string(),
            turn_detection: Some(TurnDetection::telephone_vad()),
            tools: self.tools.clone(),
            tool_choice: if self.tools.is_empty() {
                None
            } else {
                Some("auto".to_string())
            },
        }
    }
}

/// One live session against the realtime backend.
pub struct RealtimeSession {
    state: Arc<SessionStateCell>,
    pending: Arc<Mutex<PendingAudio>>,
    turn: Arc<TurnGate>,
    ws_tx: Arc<Mutex<Option<mpsc::Sender<ClientEvent>>>>,
}

impl RealtimeSession {
    /// Start a session: connect in the background and wire `hooks` to the
    /// event stream.
    ///
    /// Returns immediately; audio sent before the connection opens is staged
    /// and flushed on open. If the handshake fails the session stays
    /// `Pending`, audio continues to stage, and [`end`](Self::end) performs
    /// the close when the call finishes.
    pub fn start(config: RealtimeSessionConfig, hooks: SessionHooks) -> Self {
        let state = Arc::new(SessionStateCell::new());
        let pending = Arc::new(Mutex::new(PendingAudio::new()));
        let turn = Arc::new(TurnGate::new(config.turn_timeout));
        // The sender is installed before the task starts, so audio staged
        // after the drain always has somewhere to go.
        let (tx, rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let ws_tx = Arc::new(Mutex::new(Some(tx)));

        tokio::spawn(run_connection(
            config,
            hooks,
            state.clone(),
            pending.clone(),
            turn.clone(),
            ws_tx.clone(),
            rx,
        ));

        Self {
            state,
            pending,
            turn,
            ws_tx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Forward one base64 caller audio chunk toward the backend.
    ///
    /// Before the handshake completes the chunk is staged; afterwards it is
    /// appended to the input buffer, and if no model turn is in flight a new
    /// response is requested. After close, chunks are quietly dropped.
    pub async fn send_audio(&self, chunk: String) {
        if self.state.get() == SessionState::Closed {
            tracing::debug!("dropping audio chunk on closed session");
            return;
        }

        // The pending lock makes staging atomic with the open-time drain: a
        // chunk either lands in the buffer before the drain or bypasses it
        // entirely, never both and never neither.
        let forwarded = {
            let mut pending = self.pending.lock().await;
            pending.push(chunk)
        };
        let Some(chunk) = forwarded else {
            return;
        };

        let tx = { self.ws_tx.lock().await.clone() };
        let Some(tx) = tx else {
            tracing::debug!("dropping audio chunk, outbound channel gone");
            return;
        };

        if tx.send(ClientEvent::audio_append(chunk)).await.is_err() {
            tracing::debug!("dropping audio chunk, session task finished");
            return;
        }

        if self.turn.try_begin()
            && tx
                .send(ClientEvent::ResponseCreate {
                    response: Some(ResponseConfig::default()),
                })
                .await
                .is_err()
        {
            // The turn never reached the backend; give the slot back.
            self.turn.release();
        }
    }

    /// End the session: best-effort commit of buffered input, then close.
    /// Idempotent.
    pub async fn end(&self) {
        if self.state.get() == SessionState::Closed {
            return;
        }

        let tx = { self.ws_tx.lock().await.take() };
        if let Some(tx) = tx
            && self.state.get() == SessionState::Open
        {
            // Best effort; the connection may already be gone.
            let _ = tx.send(ClientEvent::InputAudioBufferCommit).await;
        }
        // Dropping the sender lets the connection task drain the commit and
        // then wind down with a proper close frame.

        let _ = self.state.transition(SessionState::Closed);
    }
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("state", &self.state.get())
            .finish()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_connection(
    config: RealtimeSessionConfig,
    hooks: SessionHooks,
    state: Arc<SessionStateCell>,
    pending: Arc<Mutex<PendingAudio>>,
    turn: Arc<TurnGate>,
    ws_tx: Arc<Mutex<Option<mpsc::Sender<ClientEvent>>>>,
    mut rx: mpsc::Receiver<ClientEvent>,
) {
    let url = format!("{}?model={}", config.endpoint, config.model.as_str());

    let request = match url.clone().into_client_request() {
        Ok(mut request) => {
            let headers = request.headers_mut();
            match format!("Bearer {}", config.api_key).parse() {
                Ok(value) => {
                    headers.insert("Authorization", value);
                }
                Err(err) => {
                    tracing::error!(error = %err, "invalid api key for realtime backend");
                    return;
                }
            }
            headers.insert("OpenAI-Beta", http::HeaderValue::from_static("realtime=v1"));
            request
        }
        Err(err) => {
            tracing::error!(error = %err, url = %url, "invalid realtime endpoint");
            return;
        }
    };

    // A failed handshake leaves the session pending: callers keep staging
    // audio and end() closes the session when the call finishes.
    let (mut stream, _) = match connect_async(request).await {
        Ok(ok) => ok,
        Err(err) => {
            tracing::error!(error = %err, "realtime handshake failed");
            return;
        }
    };
    tracing::info!(model = %config.model, voice = %config.voice, "realtime session connected");

    // Session configuration goes out first, then every chunk staged during
    // the handshake, in arrival order. No response is requested here; turn
    // starts belong to the live audio path.
    let session_update = ClientEvent::SessionUpdate {
        session: config.session_config(),
    };
    if let Err(err) = send_event(&mut stream, &session_update).await {
        tracing::error!(error = %err, "failed to push session configuration");
        close_session(&state, &ws_tx).await;
        return;
    }

    {
        let mut pending = pending.lock().await;
        let staged = pending.drain();
        if !staged.is_empty() {
            tracing::debug!(chunks = staged.len(), "flushing staged caller audio");
        }
        for chunk in staged {
            if let Err(err) = send_event(&mut stream, &ClientEvent::audio_append(chunk)).await {
                tracing::error!(error = %err, "failed to flush staged audio");
                drop(pending);
                close_session(&state, &ws_tx).await;
                return;
            }
        }
        // Open is published while the pending lock is held, so no chunk can
        // slip between the drain and the state change.
        if let Err(err) = state.transition(SessionState::Open) {
            // end() won the race; shut the connection down.
            tracing::debug!(error = %err, "session ended during handshake");
            drop(pending);
            let _ = stream.close(None).await;
            return;
        }
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(event) => {
                        if let Err(err) = send_event(&mut stream, &event).await {
                            tracing::warn!(error = %err, "realtime send failed, closing session");
                            break;
                        }
                    }
                    // All senders dropped; the session is ending.
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_server_frame(text.as_str(), &hooks, &turn).await;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if stream.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("realtime backend closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "realtime websocket error");
                        break;
                    }
                }
            }
        }
    }

    let _ = stream.close(None).await;
    close_session(&state, &ws_tx).await;
    tracing::info!("realtime session closed");
}

async fn send_event(
    stream: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    event: &ClientEvent,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    // ClientEvent serialization cannot fail; the types contain only strings
    // and plain JSON values.
    let json = serde_json::to_string(event).unwrap_or_default();
    stream.send(Message::text(json)).await
}

async fn handle_server_frame(raw: &str, hooks: &SessionHooks, turn: &TurnGate) {
    let event = match decode_server_event(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed realtime frame");
            return;
        }
    };

    match event {
        RealtimeEvent::Audio(chunk) => {
            hooks.emit_audio(&chunk).await;
        }
        RealtimeEvent::Terminal { kind } => {
            if kind == "response.error" {
                tracing::error!("realtime response finished with an error");
            }
            turn.release();
        }
        RealtimeEvent::ToolCall { name, arguments } => {
            if name != LEAD_TOOL_NAME {
                tracing::warn!(tool = %name, "model invoked an unknown tool");
                return;
            }
            match LeadRecord::from_tool_arguments(&arguments) {
                Ok(lead) => {
                    tracing::info!(caller = %lead.name, "lead captured");
                    hooks.emit_lead(&lead).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "discarding unparseable lead");
                }
            }
        }
        RealtimeEvent::BackendError { kind, message } => {
            tracing::error!(kind = %kind, message = %message, "realtime backend error");
        }
        RealtimeEvent::Ignored(kind) => {
            tracing::trace!(kind = %kind, "ignoring realtime event");
        }
    }
}

async fn close_session(
    state: &SessionStateCell,
    ws_tx: &Mutex<Option<mpsc::Sender<ClientEvent>>>,
) {
    ws_tx.lock().await.take();
    let _ = state.transition(SessionState::Closed);
}

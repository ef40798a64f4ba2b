//! The call bridge: telephony media stream on one side, realtime AI session
//! on the other.
//!
//! One WebSocket connection here is one phone call. The handler owns the
//! telephony socket, a [`RealtimeSession`] toward the AI backend and a small
//! event channel the session's hooks feed into, and pumps all of it through a
//! single select loop. A call is the unit of failure isolation: whatever goes
//! wrong in here ends this call and nothing else.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Extension, Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::BusinessConfig;
use crate::core::lead::{LeadRecord, lead_tool};
use crate::core::realtime::SessionHooks;
use crate::core::realtime::openai::{
    RealtimeModel, RealtimeSession, RealtimeSessionConfig, RealtimeVoice,
};
use crate::core::telephony::{TelephonyEvent, decode_frame, encode_media_frame};
use crate::delivery::CallMetadata;
use crate::state::{AppState, CallSlot};

/// Capacity of the per-call event channel between session hooks and the
/// bridge loop.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Query parameters on the media stream URL.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Dialled number, set by the voice webhook when known
    pub to: Option<String>,
}

/// Events flowing from the realtime session back into the bridge loop.
#[derive(Debug)]
enum BridgeEvent {
    /// Model audio for the caller (base64, provider-native encoding)
    Audio(String),
    /// A captured lead ready for delivery
    Lead(LeadRecord),
}

/// Upgrade the telephony media stream connection.
///
/// The [`CallSlot`] extension comes from the connection limit middleware and
/// moves into the call task, so the slot is held exactly as long as the call.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<Arc<AppState>>,
    Extension(slot): Extension<CallSlot>,
) -> Response {
    ws.on_upgrade(move |socket| handle_media_stream(socket, query.to, state, slot))
}

async fn handle_media_stream(
    socket: WebSocket,
    dialled: Option<String>,
    state: Arc<AppState>,
    slot: CallSlot,
) {
    // Dropping the slot on any exit path frees capacity for the next caller.
    let _slot = slot;
    let call_id = Uuid::new_v4().to_string();
    let business = state.businesses.resolve(dialled.as_deref()).clone();
    tracing::info!(
        call_id = %call_id,
        business = %business.business_name,
        "media stream connected"
    );

    let Some(api_key) = state.config.openai_api_key.clone() else {
        tracing::error!(call_id = %call_id, "no realtime api key configured, dropping call");
        drop(socket);
        return;
    };

    let (tx, rx) = mpsc::channel::<BridgeEvent>(CHANNEL_BUFFER_SIZE);

    let audio_tx = tx.clone();
    let lead_tx = tx;
    let hooks = SessionHooks::new()
        .on_audio(Arc::new(move |chunk| {
            let tx = audio_tx.clone();
            Box::pin(async move {
                // A full channel means the telephony side stopped
                // draining; audio is dropped rather than blocking.
                let _ = tx.try_send(BridgeEvent::Audio(chunk));
            })
        }))
        .on_lead(Arc::new(move |lead| {
            let tx = lead_tx.clone();
            Box::pin(async move {
                if tx.send(BridgeEvent::Lead(lead)).await.is_err() {
                    tracing::error!("lead captured after bridge loop ended, lost");
                }
            })
        }));

    let session = RealtimeSession::start(session_config(&state, api_key, &business), hooks);

    run_bridge(socket, rx, &session, &state, &call_id, &business, dialled).await;

    session.end().await;
    tracing::info!(call_id = %call_id, "call ended");
}

fn session_config(
    state: &AppState,
    api_key: String,
    business: &BusinessConfig,
) -> RealtimeSessionConfig {
    let mut config = RealtimeSessionConfig::new(api_key);
    config.model = RealtimeModel::from_str_or_default(&state.config.realtime_model);
    config.voice = business
        .voice
        .as_deref()
        .map(RealtimeVoice::from_str_or_default)
        .unwrap_or_default();
    config.instructions = business.instructions();
    config.tools = vec![lead_tool()];
    config.turn_timeout = state.config.turn_timeout_secs.map(Duration::from_secs);
    config
}

async fn run_bridge(
    socket: WebSocket,
    mut rx: mpsc::Receiver<BridgeEvent>,
    session: &RealtimeSession,
    state: &AppState,
    call_id: &str,
    business: &BusinessConfig,
    dialled: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut stream_sid: Option<String> = None;

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match decode_frame(text.as_str()) {
                            Ok(TelephonyEvent::Start { stream_sid: sid }) => {
                                tracing::info!(call_id = %call_id, stream_sid = %sid, "telephony stream started");
                                stream_sid = Some(sid);
                            }
                            Ok(TelephonyEvent::Media { payload }) => {
                                session.send_audio(payload).await;
                            }
                            Ok(TelephonyEvent::Stop) => {
                                tracing::info!(call_id = %call_id, "telephony stream stopped");
                                break;
                            }
                            Ok(TelephonyEvent::Ignored { kind }) => {
                                tracing::trace!(kind = %kind, "ignoring telephony event");
                            }
                            Err(err) => {
                                tracing::warn!(call_id = %call_id, error = %err, "skipping telephony frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(call_id = %call_id, "telephony socket closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(call_id = %call_id, error = %err, "telephony socket error");
                        break;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Some(BridgeEvent::Audio(chunk)) => {
                        if let Some(frame) = caller_media_frame(stream_sid.as_deref(), &chunk, call_id)
                            && sender.send(Message::Text(frame.into())).await.is_err()
                        {
                            tracing::info!(call_id = %call_id, "telephony send failed, ending call");
                            break;
                        }
                    }
                    Some(BridgeEvent::Lead(lead)) => {
                        let meta = CallMetadata::new(
                            call_id.to_string(),
                            business.business_name.clone(),
                            dialled.clone(),
                        );
                        let sink = state.lead_sink.clone();
                        // Delivery runs off the bridge loop so a slow
                        // endpoint cannot stall call audio.
                        tokio::spawn(async move {
                            if let Err(err) = sink.deliver(&lead, &meta).await {
                                tracing::error!(
                                    call_id = %meta.call_id,
                                    error = %err,
                                    "lead delivery failed"
                                );
                            }
                        });
                    }
                    None => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

/// Wrap one chunk of model audio for the caller.
///
/// Audio arriving before the start event has nowhere to go; the caller is
/// not addressable until the stream sid is known, so the chunk is dropped.
fn caller_media_frame(stream_sid: Option<&str>, chunk: &str, call_id: &str) -> Option<String> {
    let Some(sid) = stream_sid else {
        tracing::debug!(call_id = %call_id, "dropping model audio, stream sid unknown");
        return None;
    };
    match encode_media_frame(sid, chunk) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::error!(call_id = %call_id, error = %err, "failed to encode media frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_audio_before_start_is_dropped() {
        assert!(caller_media_frame(None, "b64-chunk", "call-1").is_none());
    }

    #[test]
    fn test_model_audio_after_start_is_framed() {
        let frame = caller_media_frame(Some("MZ123"), "b64-chunk", "call-1").unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["event"], "media");
        assert_eq!(value["streamSid"], "MZ123");
        assert_eq!(value["media"]["payload"], "b64-chunk");
    }
}

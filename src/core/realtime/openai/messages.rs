//! Wire types for the OpenAI Realtime websocket protocol.
//!
//! Client events are a tagged serde enum serialized as JSON text frames.
//! Server events come in several protocol dialects; [`decode_server_event`]
//! normalizes them into the small canonical [`RealtimeEvent`] set the bridge
//! actually dispatches on, so the rest of the gateway never sees the raw
//! envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::telephony::truncate_raw;

// =============================================================================
// Client -> Server Events
// =============================================================================

/// Events sent from the gateway to the realtime backend.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Push session configuration (first frame after the socket opens)
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append one base64 audio chunk to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64 audio payload, passed through unmodified
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a model response
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
}

impl ClientEvent {
    /// Append event for an audio chunk already in the wire encoding.
    ///
    /// The chunk is a base64 string straight off the telephony socket; it is
    /// never decoded or re-encoded on the way through.
    pub fn audio_append(chunk: String) -> Self {
        ClientEvent::InputAudioBufferAppend { audio: chunk }
    }
}

/// Session configuration pushed via `session.update`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    /// Output modalities, e.g. ["text", "audio"]
    pub modalities: Vec<String>,
    /// System instructions for the assistant
    pub instructions: String,
    /// Voice for audio output
    pub voice: String,
    /// Input audio encoding
    pub input_audio_format: String,
    /// Output audio encoding
    pub output_audio_format: String,
    /// Turn detection settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    /// Tools exposed to the model
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDef>,
    /// Tool selection policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Backend-side voice activity detection
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Trailing silence before a turn ends, in milliseconds
        silence_duration_ms: u32,
        /// Audio included before detected speech, in milliseconds
        prefix_padding_ms: u32,
    },
}

impl TurnDetection {
    /// Server VAD tuned for telephone speech: callers pause mid-sentence, so
    /// the silence window is generous.
    pub fn telephone_vad() -> Self {
        TurnDetection::ServerVad {
            silence_duration_ms: 2000,
            prefix_padding_ms: 400,
        }
    }
}

/// One tool (function) definition exposed to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    /// Tool kind, always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name the model calls
    pub name: String,
    /// Description shown to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Per-response overrides for `response.create`. Empty today; the session
/// defaults carry everything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseConfig {}

// =============================================================================
// Server -> Client Events
// =============================================================================

/// Errors from decoding server frames.
#[derive(Debug, Error)]
pub enum RealtimeCodecError {
    /// Frame could not be parsed as a server event envelope
    #[error("malformed realtime server event: {source} (raw: {raw})")]
    Malformed {
        /// Truncated raw payload for logging
        raw: String,
        /// Underlying parse error
        source: serde_json::Error,
    },
}

/// Canonical server event, normalized across protocol dialects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// One base64 chunk of model audio output
    Audio(String),
    /// The model invoked a tool
    ToolCall {
        /// Function name
        name: String,
        /// JSON-encoded arguments string, unparsed
        arguments: String,
    },
    /// A response finished, successfully or not
    Terminal {
        /// The terminal event kind as it appeared on the wire
        kind: String,
    },
    /// Backend-reported error outside the response lifecycle
    BackendError {
        /// Error kind
        kind: String,
        /// Human-readable message if present
        message: String,
    },
    /// Valid envelope, but not an event the bridge acts on
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct RawServerEvent {
    #[serde(rename = "type")]
    kind: String,
    /// Audio payload in the `response.output_audio.delta` dialect
    #[serde(default)]
    audio: Option<String>,
    /// Audio payload in the `response.audio.delta` dialect
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    item: Option<RawOutputItem>,
    #[serde(default)]
    error: Option<RawErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RawOutputItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Decode one server text frame into a canonical [`RealtimeEvent`].
///
/// Both audio-delta dialects (`response.output_audio.delta` carrying `audio`,
/// `response.audio.delta` carrying `delta`) normalize to the same
/// [`RealtimeEvent::Audio`]; downstream code never branches on dialect.
pub fn decode_server_event(raw: &str) -> Result<RealtimeEvent, RealtimeCodecError> {
    let event: RawServerEvent =
        serde_json::from_str(raw).map_err(|source| RealtimeCodecError::Malformed {
            raw: truncate_raw(raw),
            source,
        })?;

    let normalized = match event.kind.as_str() {
        "response.output_audio.delta" => match event.audio {
            Some(audio) => RealtimeEvent::Audio(audio),
            None => RealtimeEvent::Ignored(event.kind),
        },
        "response.audio.delta" => match event.delta {
            Some(delta) => RealtimeEvent::Audio(delta),
            None => RealtimeEvent::Ignored(event.kind),
        },
        "response.output_item.added" => match event.item {
            Some(RawOutputItem {
                kind: Some(kind),
                name: Some(name),
                arguments: Some(arguments),
            }) if kind == "function_call" => RealtimeEvent::ToolCall { name, arguments },
            _ => RealtimeEvent::Ignored(event.kind),
        },
        "response.completed" | "response.done" | "response.error" => {
            RealtimeEvent::Terminal { kind: event.kind }
        }
        "error" => {
            let body = event.error.unwrap_or(RawErrorBody {
                kind: None,
                message: None,
            });
            RealtimeEvent::BackendError {
                kind: body.kind.unwrap_or_else(|| "unknown".to_string()),
                message: body.message.unwrap_or_default(),
            }
        }
        _ => RealtimeEvent::Ignored(event.kind),
    };

    Ok(normalized)
}

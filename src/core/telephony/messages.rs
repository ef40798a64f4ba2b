//! Twilio Media Streams wire envelope encode/decode.
//!
//! Twilio delivers call audio as JSON text frames over a WebSocket. The three
//! inbound events this gateway acts on are `start` (carries the stream SID),
//! `media` (carries one base64 audio chunk) and `stop`. Outbound audio toward
//! the caller is wrapped in a `media` frame stamped with the stream SID.
//!
//! Audio payloads are opaque base64 strings in the provider's native encoding
//! (G.711 u-law) and are passed through untouched in both directions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of raw payload bytes preserved in decode errors.
const MAX_RAW_IN_ERROR: usize = 256;

/// Errors from the telephony frame codec.
#[derive(Debug, Error)]
pub enum TelephonyCodecError {
    /// Frame could not be parsed as a Twilio envelope
    #[error("malformed twilio frame: {source} (raw: {raw})")]
    Malformed {
        /// Truncated raw payload for logging
        raw: String,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// A recognized event was missing its required field
    #[error("twilio `{kind}` frame missing required field `{field}`")]
    MissingField {
        /// Event kind
        kind: String,
        /// Missing field name
        field: &'static str,
    },

    /// Outbound encode attempted before the stream SID is known
    #[error("cannot encode media frame without a stream sid")]
    MissingStreamSid,
}

/// Canonical inbound telephony event, normalized from the wire envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyEvent {
    /// Stream established; carries the transport-assigned stream SID
    Start {
        /// Opaque stream identifier for this call
        stream_sid: String,
    },
    /// One chunk of caller audio (base64, provider-native encoding)
    Media {
        /// Base64 audio payload, passed through unmodified
        payload: String,
    },
    /// Stream ended by the transport
    Stop,
    /// Recognized as a valid envelope but not an event this gateway acts on
    Ignored {
        /// The event kind as it appeared on the wire
        kind: String,
    },
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    start: Option<StartMeta>,
    #[serde(default)]
    media: Option<MediaPayload>,
}

#[derive(Debug, Deserialize)]
struct StartMeta {
    #[serde(rename = "streamSid")]
    stream_sid: String,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    payload: String,
}

#[derive(Debug, Serialize)]
struct OutboundMediaFrame<'a> {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: &'a str,
    media: OutboundMediaPayload<'a>,
}

#[derive(Debug, Serialize)]
struct OutboundMediaPayload<'a> {
    payload: &'a str,
}

/// Decode one inbound Twilio text frame into a canonical [`TelephonyEvent`].
///
/// Unknown event kinds decode to [`TelephonyEvent::Ignored`]; only frames that
/// fail to parse as a Twilio envelope at all are errors.
pub fn decode_frame(raw: &str) -> Result<TelephonyEvent, TelephonyCodecError> {
    let frame: InboundFrame =
        serde_json::from_str(raw).map_err(|source| TelephonyCodecError::Malformed {
            raw: truncate_raw(raw),
            source,
        })?;

    match frame.event.as_str() {
        "start" => {
            let start = frame.start.ok_or(TelephonyCodecError::MissingField {
                kind: frame.event.clone(),
                field: "start.streamSid",
            })?;
            Ok(TelephonyEvent::Start {
                stream_sid: start.stream_sid,
            })
        }
        "media" => {
            let media = frame.media.ok_or(TelephonyCodecError::MissingField {
                kind: frame.event.clone(),
                field: "media.payload",
            })?;
            Ok(TelephonyEvent::Media {
                payload: media.payload,
            })
        }
        "stop" => Ok(TelephonyEvent::Stop),
        _ => Ok(TelephonyEvent::Ignored { kind: frame.event }),
    }
}

/// Encode one outbound audio chunk as a Twilio `media` frame.
///
/// Callers must not invoke this before the stream SID is known.
pub fn encode_media_frame(stream_sid: &str, payload: &str) -> Result<String, TelephonyCodecError> {
    if stream_sid.is_empty() {
        return Err(TelephonyCodecError::MissingStreamSid);
    }

    let frame = OutboundMediaFrame {
        event: "media",
        stream_sid,
        media: OutboundMediaPayload { payload },
    };

    serde_json::to_string(&frame).map_err(|source| TelephonyCodecError::Malformed {
        raw: truncate_raw(payload),
        source,
    })
}

/// Truncate a raw payload for inclusion in an error or log line.
pub(crate) fn truncate_raw(raw: &str) -> String {
    if raw.len() <= MAX_RAW_IN_ERROR {
        raw.to_string()
    } else {
        let mut end = MAX_RAW_IN_ERROR;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &raw[..end])
    }
}

//! Configuration constants and enums for the OpenAI Realtime backend.

/// OpenAI Realtime API websocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Audio encoding used on both legs of the bridge.
///
/// The telephony transport speaks G.711 u-law natively, so the session is
/// configured to consume and produce the same encoding and no transcoding
/// happens anywhere in the gateway.
pub const TELEPHONY_AUDIO_FORMAT: &str = "g711_ulaw";

/// Available OpenAI Realtime models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealtimeModel {
    /// gpt-4o-realtime-preview (latest)
    #[default]
    Gpt4oRealtimePreview,
    /// gpt-4o-realtime-preview-2024-12-17
    Gpt4oRealtimePreview20241217,
    /// gpt-4o-mini-realtime-preview
    Gpt4oMiniRealtimePreview,
}

impl RealtimeModel {
    /// Model identifier as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeModel::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            RealtimeModel::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
            RealtimeModel::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
        }
    }

    /// Parse a model identifier, falling back to the default for anything
    /// unrecognized.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "gpt-4o-realtime-preview" => RealtimeModel::Gpt4oRealtimePreview,
            "gpt-4o-realtime-preview-2024-12-17" => RealtimeModel::Gpt4oRealtimePreview20241217,
            "gpt-4o-mini-realtime-preview" => RealtimeModel::Gpt4oMiniRealtimePreview,
            other => {
                tracing::warn!(model = other, "unknown realtime model, using default");
                RealtimeModel::default()
            }
        }
    }
}

impl std::fmt::Display for RealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Available voices for audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealtimeVoice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl RealtimeVoice {
    /// Voice identifier as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            RealtimeVoice::Alloy => "alloy",
            RealtimeVoice::Ash => "ash",
            RealtimeVoice::Ballad => "ballad",
            RealtimeVoice::Coral => "coral",
            RealtimeVoice::Echo => "echo",
            RealtimeVoice::Sage => "sage",
            RealtimeVoice::Shimmer => "shimmer",
            RealtimeVoice::Verse => "verse",
        }
    }

    /// Parse a voice identifier, falling back to the default for anything
    /// unrecognized.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => RealtimeVoice::Alloy,
            "ash" => RealtimeVoice::Ash,
            "ballad" => RealtimeVoice::Ballad,
            "coral" => RealtimeVoice::Coral,
            "echo" => RealtimeVoice::Echo,
            "sage" => RealtimeVoice::Sage,
            "shimmer" => RealtimeVoice::Shimmer,
            "verse" => RealtimeVoice::Verse,
            other => {
                tracing::warn!(voice = other, "unknown realtime voice, using default");
                RealtimeVoice::default()
            }
        }
    }
}

impl std::fmt::Display for RealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

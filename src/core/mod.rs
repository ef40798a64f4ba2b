//! Core bridge domain: telephony codec, realtime session, lead capture.

pub mod lead;
pub mod realtime;
pub mod telephony;

pub use lead::{LEAD_TOOL_NAME, LeadParseError, LeadRecord, Urgency, lead_tool};
pub use realtime::{RealtimeError, SessionHooks, SessionState};
pub use telephony::{TelephonyCodecError, TelephonyEvent, decode_frame, encode_media_frame};

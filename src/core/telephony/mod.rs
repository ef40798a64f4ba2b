//! Telephony transport protocol support (Twilio Media Streams).
//!
//! The codec here is pure and stateless: it translates between the telephony
//! transport's JSON envelope and the gateway's canonical events. The per-call
//! connection handling lives in `handlers::media_stream`.

mod messages;

pub use messages::{TelephonyCodecError, TelephonyEvent, decode_frame, encode_media_frame};
pub(crate) use messages::truncate_raw;

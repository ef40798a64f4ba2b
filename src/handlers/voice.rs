//! Telephony voice webhook.
//!
//! Twilio calls this endpoint when a call comes in. The response is TwiML
//! that greets the caller and then connects the call's audio to the media
//! stream WebSocket, carrying the dialled number in the stream URL so the
//! bridge can resolve the right business.

use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::state::AppState;

/// Form fields the telephony provider posts to the voice webhook.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhookForm {
    /// Dialled number, E.164
    #[serde(rename = "To")]
    pub to: Option<String>,
    /// Caller's number, E.164
    #[serde(rename = "From")]
    pub from: Option<String>,
    /// Provider-assigned call identifier
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

/// Handle an incoming call: answer with TwiML that greets the caller and
/// opens the media stream.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    Form(form): Form<VoiceWebhookForm>,
) -> Response {
    let business = state.businesses.resolve(form.to.as_deref());
    tracing::info!(
        call_sid = form.call_sid.as_deref().unwrap_or("-"),
        to = form.to.as_deref().unwrap_or("-"),
        from = form.from.as_deref().unwrap_or("-"),
        business = %business.business_name,
        "incoming call"
    );

    let mut stream_url = format!("wss://{}/twilio-media-stream", state.config.public_host);
    if let Some(to) = &form.to {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("to", to)
            .finish();
        stream_url.push('?');
        stream_url.push_str(&query);
    }

    let twiml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<Response>",
            r#"<Say voice="alice" language="{language}">{greeting}</Say>"#,
            "<Connect>",
            r#"<Stream url="{stream_url}"/>"#,
            "</Connect>",
            "</Response>"
        ),
        language = xml_escape(&business.language),
        greeting = xml_escape(&business.greeting()),
        stream_url = xml_escape(&stream_url),
    );

    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"Bob & Sons <"Ltd">"#),
            "Bob &amp; Sons &lt;&quot;Ltd&quot;&gt;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }
}

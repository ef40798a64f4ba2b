//! Lead delivery collaborators.
//!
//! A captured lead leaves the bridge through a [`LeadSink`]. Sinks are
//! pluggable behind the trait so the bridge never knows whether a lead goes
//! to a webhook, the log, or somewhere else. Delivery failures are logged and
//! never fed back into the call.

mod log;
mod webhook;

pub use log::LogSink;
pub use webhook::WebhookSink;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::lead::LeadRecord;

/// Call-scoped context attached to a lead on delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallMetadata {
    /// Gateway-assigned call identifier
    pub call_id: String,
    /// Business the call was answered for
    pub business_name: String,
    /// Number the caller dialled, when the telephony webhook provided it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialled_number: Option<String>,
    /// Fixed source tag for downstream systems
    pub source: &'static str,
    /// When the lead was captured
    #[serde(skip_serializing)]
    pub captured_at: OffsetDateTime,
}

impl CallMetadata {
    /// New metadata stamped with the current time.
    pub fn new(call_id: String, business_name: String, dialled_number: Option<String>) -> Self {
        Self {
            call_id,
            business_name,
            dialled_number,
            source: "phone_call",
            captured_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Errors from delivering a lead.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP transport failure
    #[error("lead delivery request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("lead delivery endpoint answered {status}")]
    BadStatus {
        /// HTTP status returned
        status: reqwest::StatusCode,
    },
}

/// Destination for captured leads.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Deliver one lead with its call context.
    async fn deliver(&self, lead: &LeadRecord, meta: &CallMetadata) -> Result<(), DeliveryError>;
}

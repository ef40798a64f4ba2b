//! Log-only lead delivery, the fallback when no webhook is configured.

use async_trait::async_trait;

use crate::core::lead::LeadRecord;

use super::{CallMetadata, DeliveryError, LeadSink};

/// Writes each captured lead to the structured log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl LeadSink for LogSink {
    async fn deliver(&self, lead: &LeadRecord, meta: &CallMetadata) -> Result<(), DeliveryError> {
        tracing::info!(
            call_id = %meta.call_id,
            business = %meta.business_name,
            name = %lead.name,
            phone = %lead.phone,
            postcode = %lead.postcode,
            job_type = lead.job_type.as_deref().unwrap_or("-"),
            "lead captured (no delivery endpoint configured)"
        );
        Ok(())
    }
}

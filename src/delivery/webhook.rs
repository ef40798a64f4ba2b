//! Webhook lead delivery.

use async_trait::async_trait;
use serde_json::json;
use time::format_description::well_known::Rfc3339;

use crate::core::lead::LeadRecord;

use super::{CallMetadata, DeliveryError, LeadSink};

/// Delivers leads as a JSON POST to a configured HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl LeadSink for WebhookSink {
    async fn deliver(&self, lead: &LeadRecord, meta: &CallMetadata) -> Result<(), DeliveryError> {
        // Rfc3339 formatting of a UTC timestamp cannot fail; fall back to the
        // Display form rather than panic if it somehow does.
        let captured_at = meta
            .captured_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| meta.captured_at.to_string());

        let body = json!({
            "lead": lead,
            "call": meta,
            "captured_at": captured_at,
        });

        let response = self.client.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::BadStatus {
                status: response.status(),
            });
        }

        tracing::info!(url = %self.url, call_id = %meta.call_id, "lead delivered to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_lead() -> LeadRecord {
        serde_json::from_value(serde_json::json!({
            "name": "Jane Smith",
            "phone": "07700 900123",
            "address": "1 High Street, Leeds",
            "postcode": "LS1 1AA",
            "description": "Fuse box keeps tripping"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_lead_with_call_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/leads"))
            .and(body_partial_json(serde_json::json!({
                "lead": { "name": "Jane Smith", "postcode": "LS1 1AA" },
                "call": { "business_name": "Acme Electrical", "source": "phone_call" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookSink::new(format!("{}/leads", server.uri()));
        let meta = CallMetadata::new(
            "call-1".to_string(),
            "Acme Electrical".to_string(),
            Some("+441134960000".to_string()),
        );

        sink.deliver(&sample_lead(), &meta).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = WebhookSink::new(server.uri());
        let meta = CallMetadata::new("call-2".to_string(), "Acme".to_string(), None);

        let err = sink.deliver(&sample_lead(), &meta).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::BadStatus { status } if status.as_u16() == 500
        ));
    }
}

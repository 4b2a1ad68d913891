//! Webhook notifications.
//!
//! One POST per run outcome. The payload names the order so the
//! receiving service can correlate it with the originating request.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::context::Notifier;
use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    event: &'a str,
    order_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Notifier POSTing run outcomes to a webhook endpoint.
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| WorkerError::NotifyFailed(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn post(&self, payload: &NotifyPayload<'_>) -> WorkerResult<()> {
        debug!("Sending {} notification to {}", payload.event, self.url);
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WorkerError::NotifyFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(WorkerError::NotifyFailed(format!(
                "webhook returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_success(&self, order: &str, clip_count: usize) -> WorkerResult<()> {
        self.post(&NotifyPayload {
            event: "notifySuccess",
            order_name: order,
            clip_count: Some(clip_count),
            reason: None,
        })
        .await
    }

    async fn notify_failure(&self, order: &str, reason: &str) -> WorkerResult<()> {
        self.post(&NotifyPayload {
            event: "notifyFailure",
            order_name: order,
            clip_count: None,
            reason: Some(reason),
        })
        .await
    }
}

/// No-op notifier used when no webhook endpoint is configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_success(&self, order: &str, clip_count: usize) -> WorkerResult<()> {
        debug!("No webhook configured; dropping success for {order} ({clip_count} clips)");
        Ok(())
    }

    async fn notify_failure(&self, order: &str, reason: &str) -> WorkerResult<()> {
        debug!("No webhook configured; dropping failure for {order}: {reason}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_success_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/runs"))
            .and(body_partial_json(json!({
                "event": "notifySuccess",
                "order_name": "000042e0320210304050607",
                "clip_count": 3
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hooks/runs", server.uri())).unwrap();
        notifier
            .notify_success("000042e0320210304050607", 3)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri()).unwrap();
        let err = notifier
            .notify_failure("order", "upload failed")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NotifyFailed(_)));
    }
}

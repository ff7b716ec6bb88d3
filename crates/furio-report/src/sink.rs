//! Report destinations.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::{ActionReport, ReportError};

/// A destination for finished reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, report: &ActionReport) -> Result<(), ReportError>;
}

/// Writes the report to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, report: &ActionReport) -> Result<(), ReportError> {
        let body = report.to_pretty_json()?;
        info!(run_id = %report.run_id, title = %report.title, "report\n{}", body);
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a str>,
    subject: String,
    text: String,
}

/// POSTs the report as `{ to, subject, text }` JSON, for a mail relay or chat hook.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
    recipient: Option<String>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, recipient: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            recipient,
        }
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, report: &ActionReport) -> Result<(), ReportError> {
        let message = WebhookMessage {
            to: self.recipient.as_deref(),
            subject: report.subject(),
            text: report.to_pretty_json()?,
        };

        let resp = self.client.post(&self.url).json(&message).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportError::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        debug!(run_id = %report.run_id, "report delivered to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report() -> ActionReport {
        ActionReport::new("pool-only", Vec::new(), None, Utc::now())
    }

    #[tokio::test]
    async fn test_webhook_posts_subject_and_recipient() {
        let mock_server = MockServer::start().await;
        let report = report();

        Mock::given(method("POST"))
            .and(path("/hooks/report"))
            .and(body_partial_json(serde_json::json!({
                "to": "ops@example.com",
                "subject": report.subject(),
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let sink = WebhookSink::new(
            format!("{}/hooks/report", mock_server.uri()),
            Some("ops@example.com".to_string()),
        );
        sink.send(&report).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_body_is_report_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let sink = WebhookSink::new(mock_server.uri(), None);
        let report = report();
        sink.send(&report).await.unwrap();

        let received = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(body.get("to").is_none());
        let text: serde_json::Value =
            serde_json::from_str(body["text"].as_str().unwrap()).unwrap();
        assert_eq!(text["policy"], "pool-only");
        assert_eq!(text["run_id"], report.run_id.to_string());
    }

    #[tokio::test]
    async fn test_webhook_rejection_is_delivery_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("relay down"))
            .mount(&mock_server)
            .await;

        let sink = WebhookSink::new(mock_server.uri(), None);
        let err = sink.send(&report()).await.unwrap_err();

        match err {
            ReportError::Delivery { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "relay down");
            }
            other => panic!("expected delivery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_log_sink_accepts_any_report() {
        assert!(LogSink.send(&report()).await.is_ok());
    }
}

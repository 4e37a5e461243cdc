use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::WebhookPayload;

/// Whatever the webhook answered, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

/// Transport-level failures. A received HTTP response is never an error here,
/// whatever its status code.
#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("webhook did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("could not reach webhook: {0}")]
    Connection(String),
}

#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// The endpoint requests are posted to, for logging and the debug echo.
    fn endpoint(&self) -> &str;

    async fn send(&self, payload: &WebhookPayload) -> Result<WebhookReply, WebhookError>;
}

pub struct HttpWebhookClient {
    http_client: Arc<reqwest::Client>,
    url: String,
    timeout: Duration,
}

impl HttpWebhookClient {
    pub fn new(http_client: Arc<reqwest::Client>, url: String, timeout: Duration) -> Self {
        Self {
            http_client,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn send(&self, payload: &WebhookPayload) -> Result<WebhookReply, WebhookError> {
        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(WebhookError::Timeout(self.timeout)),
            Err(e) => {
                tracing::warn!(status, error = %e, "failed to read webhook response body");
                String::new()
            }
        };

        tracing::debug!(status, bytes = body.len(), "webhook answered");
        Ok(WebhookReply { status, body })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> WebhookError {
    if err.is_timeout() {
        WebhookError::Timeout(timeout)
    } else {
        WebhookError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DealStatus, ReportRequest};
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> WebhookPayload {
        ReportRequest::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            5000.0,
            vec![DealStatus::Won, DealStatus::Closed],
            "#sales-reports".to_string(),
        )
        .unwrap()
        .payload()
    }

    fn client(url: String, timeout: Duration) -> HttpWebhookClient {
        HttpWebhookClient::new(Arc::new(reqwest::Client::new()), url, timeout)
    }

    #[tokio::test]
    async fn test_posts_payload_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/madison-sales-webhook"))
            .and(body_json(json!({
                "start_date": "2024-03-01",
                "end_date": "2024-03-08",
                "min_deal_value": 5000.0,
                "deal_status": ["Won", "Closed"],
                "slack_channel": "#sales-reports",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/webhook/madison-sales-webhook", server.uri());
        let reply = client(url, Duration::from_secs(5))
            .send(&payload())
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
            .mount(&server)
            .await;

        let reply = client(server.uri(), Duration::from_secs(5))
            .send(&payload())
            .await
            .unwrap();

        assert_eq!(reply.status, 500);
        assert_eq!(reply.body, "workflow crashed");
    }

    #[tokio::test]
    async fn test_slow_webhook_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = client(server.uri(), Duration::from_millis(100))
            .send(&payload())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_connection_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client(format!("http://127.0.0.1:{port}/webhook"), Duration::from_secs(5))
            .send(&payload())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Connection(_)));
    }

    #[test]
    fn test_timeout_display_names_seconds() {
        let err = WebhookError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "webhook did not answer within 60s");
    }
}

use serde::Serialize;
use serde_json::{Value, json};

use super::webhook::WebhookError;

/// Outcome class of one webhook round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Success,
    ServerError,
    NotFound,
    OtherError,
    Timeout,
    ConnectionError,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => StatusCategory::Success,
            500 => StatusCategory::ServerError,
            404 => StatusCategory::NotFound,
            _ => StatusCategory::OtherError,
        }
    }

    /// User-facing next steps for this outcome.
    pub fn guidance(self) -> &'static str {
        match self {
            StatusCategory::Success => "Report generated successfully.",
            StatusCategory::ServerError => {
                "The workflow encountered an error. Troubleshooting:\n\
                 1. Check that the workflow is activated\n\
                 2. Verify all nodes in the workflow are properly configured\n\
                 3. Check the workflow execution logs for detailed error messages\n\
                 4. Ensure the CRM and Slack credentials used by the workflow are valid\n\
                 5. Make sure the webhook path is correct"
            }
            StatusCategory::NotFound => {
                "The webhook is not registered. This usually means the workflow is not \
                 activated, the webhook path does not match, or the engine has not finished \
                 registering it. To fix:\n\
                 1. Activate the workflow\n\
                 2. Wait a few seconds after activating\n\
                 3. Try again"
            }
            StatusCategory::OtherError => {
                "The webhook returned an unexpected status. The raw response is shown as received."
            }
            StatusCategory::Timeout => {
                "The request timed out. The workflow may still be processing; check the \
                 destination channel in a few moments. If the report does not appear, the \
                 workflow may have encountered an issue."
            }
            StatusCategory::ConnectionError => {
                "Could not reach the automation server. Check that:\n\
                 1. The automation service is running\n\
                 2. The workflow is activated\n\
                 3. The webhook URL is correct"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Summary,
    Insight,
    Recommendation,
}

/// A report line worth highlighting on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub status_category: StatusCategory,
    pub http_status: Option<u16>,
    /// Parsed JSON when the body parses, otherwise the text as a JSON string.
    pub raw_body: Option<Value>,
    pub message_text: Option<String>,
    pub channel_echo: Option<String>,
    pub timestamp: Option<String>,
    /// The body carried no message but reported `ok: true`.
    pub delivered: bool,
    pub insights: Vec<Insight>,
    /// Transport failure detail for `Timeout` / `ConnectionError`.
    pub error: Option<String>,
}

impl ReportResponse {
    fn empty(status_category: StatusCategory, http_status: Option<u16>) -> Self {
        Self {
            status_category,
            http_status,
            raw_body: None,
            message_text: None,
            channel_echo: None,
            timestamp: None,
            delivered: false,
            insights: Vec::new(),
            error: None,
        }
    }

    pub fn from_transport_error(err: &WebhookError) -> Self {
        let category = match err {
            WebhookError::Timeout(_) => StatusCategory::Timeout,
            WebhookError::Connection(_) => StatusCategory::ConnectionError,
        };
        Self {
            error: Some(err.to_string()),
            ..Self::empty(category, None)
        }
    }

    pub fn guidance(&self) -> &'static str {
        self.status_category.guidance()
    }
}

/// Classify a received webhook response and pull out the report message.
pub fn interpret(status: u16, body: &str, requested_channel: &str) -> ReportResponse {
    let category = StatusCategory::from_status(status);
    let mut response = ReportResponse::empty(category, Some(status));

    match category {
        StatusCategory::Success => {
            let parsed = serde_json::from_str::<Value>(body).unwrap_or_else(|_| {
                json!({ "success": true, "message": "Workflow executed successfully" })
            });
            extract_message(&parsed, requested_channel, &mut response);
            response.raw_body = Some(parsed);
        }
        StatusCategory::ServerError => {
            response.raw_body = Some(
                serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.into())),
            );
        }
        _ => {
            response.raw_body = Some(Value::String(body.to_string()));
        }
    }

    response
}

fn extract_message(body: &Value, requested_channel: &str, response: &mut ReportResponse) {
    let body_channel = body.get("channel").and_then(Value::as_str);

    if let Some(message) = body.get("message").filter(|m| m.is_object()) {
        response.message_text = message
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from);
    }

    if let Some(text) = &response.message_text {
        response.channel_echo = Some(body_channel.unwrap_or(requested_channel).to_string());
        response.timestamp = body.get("message_timestamp").and_then(|ts| match ts {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        response.insights = key_insights(text);
    } else if body.get("ok").and_then(Value::as_bool) == Some(true) {
        response.delivered = true;
        response.channel_echo = Some(requested_channel.to_string());
    }
}

/// Highlight trend, summary, insight and recommendation lines. Only reports
/// that carry a `Latest:`/`Prev:` comparison are scanned.
pub fn key_insights(text: &str) -> Vec<Insight> {
    if !(text.contains("Latest:") && text.contains("Prev:")) {
        return Vec::new();
    }

    text.lines()
        .filter_map(|line| {
            let kind = if line.contains("Latest:") {
                InsightKind::Trend
            } else if line.contains("Summary:") {
                InsightKind::Summary
            } else if line.contains("Insight:") {
                InsightKind::Insight
            } else if line.contains("Recommendation:") {
                InsightKind::Recommendation
            } else {
                return None;
            };
            Some(Insight {
                kind,
                line: line.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const REPORT: &str = "Won Deals: 5\nLatest: 1200 | Prev: 1000\nWoW: +20%";

    #[test]
    fn test_success_extracts_message_and_channel() {
        let body = json!({ "message": { "text": REPORT }, "channel": "#sales" }).to_string();
        let response = interpret(200, &body, "#sales-reports");

        assert_eq!(response.status_category, StatusCategory::Success);
        assert_eq!(response.message_text.as_deref(), Some(REPORT));
        assert_eq!(response.channel_echo.as_deref(), Some("#sales"));
        assert!(!response.delivered);
    }

    #[test]
    fn test_success_without_channel_echoes_requested_channel() {
        let body = json!({
            "message": { "text": "Closed Deals: 3" },
            "message_timestamp": "1712345678.000100",
        })
        .to_string();
        let response = interpret(200, &body, "#sales-reports");

        assert_eq!(response.channel_echo.as_deref(), Some("#sales-reports"));
        assert_eq!(response.timestamp.as_deref(), Some("1712345678.000100"));
    }

    #[test]
    fn test_unparseable_success_body_assumes_success() {
        let response = interpret(200, "Workflow was started", "#sales-reports");

        assert_eq!(response.status_category, StatusCategory::Success);
        assert!(response.message_text.is_none());
        assert!(!response.delivered);
        assert_eq!(
            response.raw_body,
            Some(json!({ "success": true, "message": "Workflow executed successfully" }))
        );
    }

    #[test]
    fn test_ok_fallback_reports_delivery() {
        let response = interpret(200, r#"{"ok": true}"#, "#sales-reports");

        assert!(response.message_text.is_none());
        assert!(response.delivered);
        assert_eq!(response.channel_echo.as_deref(), Some("#sales-reports"));

        let with_channel = interpret(200, r#"{"ok": true, "channel": "C024BE91L"}"#, "#sales-reports");
        assert_eq!(with_channel.channel_echo.as_deref(), Some("#sales-reports"));
    }

    #[test]
    fn test_empty_message_text_is_not_a_report() {
        let body = json!({ "message": { "text": "" }, "ok": false }).to_string();
        let response = interpret(200, &body, "#sales-reports");

        assert!(response.message_text.is_none());
        assert!(!response.delivered);
        assert!(response.channel_echo.is_none());
    }

    #[test]
    fn test_not_found_has_no_message() {
        let response = interpret(404, "webhook not registered", "#sales-reports");

        assert_eq!(response.status_category, StatusCategory::NotFound);
        assert!(response.message_text.is_none());
        assert_eq!(response.raw_body, Some(json!("webhook not registered")));
    }

    #[test]
    fn test_server_error_keeps_json_body() {
        let response = interpret(500, r#"{"message":"Airtable node failed"}"#, "#sales-reports");

        assert_eq!(response.status_category, StatusCategory::ServerError);
        assert_eq!(response.raw_body, Some(json!({ "message": "Airtable node failed" })));
        assert!(response.message_text.is_none());
    }

    #[test]
    fn test_other_status_keeps_raw_text() {
        let response = interpret(403, "forbidden", "#sales-reports");
        assert_eq!(response.status_category, StatusCategory::OtherError);
        assert_eq!(response.http_status, Some(403));
        assert_eq!(response.raw_body, Some(json!("forbidden")));
    }

    #[test]
    fn test_transport_errors_map_to_categories() {
        let timeout = ReportResponse::from_transport_error(&WebhookError::Timeout(
            Duration::from_secs(60),
        ));
        assert_eq!(timeout.status_category, StatusCategory::Timeout);
        assert!(timeout.http_status.is_none());

        let refused =
            ReportResponse::from_transport_error(&WebhookError::Connection("refused".into()));
        assert_eq!(refused.status_category, StatusCategory::ConnectionError);
        assert_eq!(refused.error.as_deref(), Some("could not reach webhook: refused"));
    }

    #[test]
    fn test_each_category_has_distinct_guidance() {
        let categories = [
            StatusCategory::Success,
            StatusCategory::ServerError,
            StatusCategory::NotFound,
            StatusCategory::OtherError,
            StatusCategory::Timeout,
            StatusCategory::ConnectionError,
        ];
        for (i, a) in categories.iter().enumerate() {
            for b in &categories[i + 1..] {
                assert_ne!(a.guidance(), b.guidance());
            }
        }
    }

    #[test]
    fn test_key_insights_need_latest_and_prev() {
        assert!(key_insights("Summary: steady week").is_empty());

        let text = "Pipeline\n  Latest: 1200 | Prev: 1000\nSummary: up\nInsight: big deals\nRecommendation: follow up";
        let insights = key_insights(text);
        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Trend,
                InsightKind::Summary,
                InsightKind::Insight,
                InsightKind::Recommendation
            ]
        );
        assert_eq!(insights[0].line, "Latest: 1200 | Prev: 1000");
    }
}

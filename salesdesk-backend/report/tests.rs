use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use super::interpreter::StatusCategory;
use super::webhook::{WebhookClient, WebhookError, WebhookReply};
use super::*;
use crate::chat::Role;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request() -> ReportRequest {
    ReportRequest::new(
        date(2024, 3, 1),
        date(2024, 3, 8),
        0.0,
        default_deal_statuses(),
        "#sales-reports".to_string(),
    )
    .unwrap()
}

/// Answers every call with the next queued result.
struct FakeWebhook {
    replies: Mutex<Vec<Result<WebhookReply, WebhookError>>>,
    sent: Mutex<Vec<WebhookPayload>>,
}

impl FakeWebhook {
    fn new(mut replies: Vec<Result<WebhookReply, WebhookError>>) -> Self {
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WebhookClient for FakeWebhook {
    fn endpoint(&self) -> &str {
        "http://localhost:5678/webhook/test"
    }

    async fn send(&self, payload: &WebhookPayload) -> Result<WebhookReply, WebhookError> {
        self.sent.lock().unwrap().push(payload.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .expect("unexpected webhook call")
    }
}

fn ok(body: serde_json::Value) -> Result<WebhookReply, WebhookError> {
    Ok(WebhookReply {
        status: 200,
        body: body.to_string(),
    })
}

fn status(code: u16, body: &str) -> Result<WebhookReply, WebhookError> {
    Ok(WebhookReply {
        status: code,
        body: body.to_string(),
    })
}

// --- ReportRequest ---

#[test]
fn test_payload_dates_are_iso() {
    let payload = request().payload();
    assert_eq!(payload.start_date, "2024-03-01");
    assert_eq!(payload.end_date, "2024-03-08");
    assert!(payload.start_date <= payload.end_date);
}

#[test]
fn test_payload_serializes_expected_fields() {
    let value = serde_json::to_value(request().payload()).unwrap();
    assert_eq!(
        value,
        json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-08",
            "min_deal_value": 0.0,
            "deal_status": ["Won", "Closed"],
            "slack_channel": "#sales-reports",
        })
    );
}

#[test]
fn test_end_before_start_rejected() {
    let err = ReportRequest::new(
        date(2024, 3, 8),
        date(2024, 3, 1),
        0.0,
        default_deal_statuses(),
        "#sales".into(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "end date 2024-03-01 is before start date 2024-03-08"
    );
}

#[test]
fn test_same_day_range_allowed() {
    assert!(
        ReportRequest::new(date(2024, 3, 1), date(2024, 3, 1), 0.0, vec![], "#s".into()).is_ok()
    );
}

#[test]
fn test_negative_or_nan_min_value_rejected() {
    for bad in [-1.0, f64::NAN, f64::INFINITY] {
        let result =
            ReportRequest::new(date(2024, 3, 1), date(2024, 3, 2), bad, vec![], "#s".into());
        assert!(matches!(result, Err(ReportError::InvalidMinDealValue(_))));
    }
}

#[test]
fn test_duplicate_statuses_collapsed_in_order() {
    let req = ReportRequest::new(
        date(2024, 3, 1),
        date(2024, 3, 2),
        0.0,
        vec![DealStatus::Lost, DealStatus::Won, DealStatus::Lost],
        "#s".into(),
    )
    .unwrap();
    assert_eq!(req.payload().deal_status, vec![DealStatus::Lost, DealStatus::Won]);
}

#[test]
fn test_deal_status_accepts_lowercase() {
    let statuses: Vec<DealStatus> = serde_json::from_str(r#"["won", "Closed"]"#).unwrap();
    assert_eq!(statuses, vec![DealStatus::Won, DealStatus::Closed]);
}

#[test]
fn test_period_presets_resolve_against_today() {
    let today = date(2024, 3, 31);
    assert_eq!(
        PeriodPreset::LastSevenDays.resolve(None, None, today),
        (date(2024, 3, 24), today)
    );
    assert_eq!(
        PeriodPreset::LastThirtyDays.resolve(Some(date(2020, 1, 1)), None, today),
        (date(2024, 3, 1), today)
    );
    assert_eq!(
        PeriodPreset::Custom.resolve(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)), today),
        (date(2024, 1, 1), date(2024, 1, 31))
    );
    assert_eq!(
        PeriodPreset::Custom.resolve(None, None, today),
        (date(2024, 3, 24), today)
    );
}

// --- generate ---

#[tokio::test]
async fn test_successful_generation_stores_report_once() {
    let text = "Won Deals: 5\nLatest: 1200 | Prev: 1000\nWoW: +20%";
    let webhook = FakeWebhook::new(vec![ok(json!({
        "message": { "text": text },
        "channel": "#sales",
    }))]);
    let mut session = Session::new();

    let response = generate(&mut session, &webhook, &request()).await;

    assert_eq!(response.status_category, StatusCategory::Success);
    assert_eq!(response.channel_echo.as_deref(), Some("#sales"));
    assert_eq!(session.report_text(), Some(text));
    assert_eq!(session.report_count(), 1);
    assert_eq!(webhook.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_not_found_leaves_previous_report() {
    let webhook = FakeWebhook::new(vec![
        ok(json!({ "message": { "text": "Won Deals: 2" } })),
        status(404, "not registered"),
    ]);
    let mut session = Session::new();

    generate(&mut session, &webhook, &request()).await;
    let response = generate(&mut session, &webhook, &request()).await;

    assert_eq!(response.status_category, StatusCategory::NotFound);
    assert!(response.message_text.is_none());
    assert_eq!(session.report_text(), Some("Won Deals: 2"));
    assert_eq!(session.report_count(), 1);
}

#[tokio::test]
async fn test_counter_only_counts_successful_generations() {
    let webhook = FakeWebhook::new(vec![
        ok(json!({ "message": { "text": "Won Deals: 1" } })),
        status(500, r#"{"error":"boom"}"#),
        Err(WebhookError::Timeout(Duration::from_secs(60))),
        ok(json!({ "ok": true })),
        ok(json!({ "message": { "text": "Won Deals: 4" } })),
    ]);
    let mut session = Session::new();

    let mut counts = Vec::new();
    for _ in 0..5 {
        generate(&mut session, &webhook, &request()).await;
        counts.push(session.report_count());
    }

    assert_eq!(counts, vec![1, 1, 1, 1, 2]);
}

#[tokio::test]
async fn test_generation_clears_transcript_even_on_failure() {
    let webhook = FakeWebhook::new(vec![Err(WebhookError::Connection("refused".into()))]);
    let mut session = Session::new();
    session.record_report("Won Deals: 1".into());
    session.push_turn(Role::User, "q".into());

    let response = generate(&mut session, &webhook, &request()).await;

    assert_eq!(response.status_category, StatusCategory::ConnectionError);
    assert!(session.transcript().is_empty());
    assert_eq!(session.report_text(), Some("Won Deals: 1"));
}

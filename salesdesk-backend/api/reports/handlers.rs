//! REST endpoints for report generation and the metrics panel.
//!
//! POST /api/reports         trigger the report workflow
//! GET  /api/reports/latest  latest stored report text and highlighted lines
//! GET  /api/metrics         derived metrics for the stored report
//! GET  /api/session         counters for the current session
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDate};
use hyper::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::report::interpreter::{self, StatusCategory};
use crate::report::{self, DealStatus, PeriodPreset, ReportRequest, default_deal_statuses};

// ── Body types ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReportBody {
    #[serde(default)]
    period: PeriodPreset,
    /// Only read for `"period": "custom"`.
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    min_deal_value: f64,
    #[serde(default = "default_deal_statuses")]
    deal_status: Vec<DealStatus>,
    /// Blank or missing falls back to the configured default channel.
    #[serde(default)]
    slack_channel: Option<String>,
}

// ── Handlers ───────────────────────────────────────────────────────────────

pub(crate) async fn generate_report(
    State(state): State<AppState>,
    Json(body): Json<GenerateReportBody>,
) -> Response {
    let (start, end) = body
        .period
        .resolve(body.start_date, body.end_date, Local::now().date_naive());
    let channel = body
        .slack_channel
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.config.default_channel.clone());

    let request = match ReportRequest::new(start, end, body.min_deal_value, body.deal_status, channel)
    {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let mut session = match state.claim_session() {
        Ok(s) => s,
        Err(busy) => return busy.into_response(),
    };

    let response = report::generate(&mut session, state.webhook_client.as_ref(), &request).await;

    let mut body = json!(response);
    body["guidance"] = json!(response.guidance());
    body["report_count"] = json!(session.report_count());
    body["request"] = json!({
        "method": "POST",
        "url": state.webhook_client.endpoint(),
        "payload": request.payload(),
    });

    (http_status(response.status_category), Json(body)).into_response()
}

pub(crate) async fn latest_report(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state.claim_session()?;
    let text = session.report_text().ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no report generated yet" })),
        )
    })?;

    Ok(Json(json!({
        "message_text": text,
        "insights": interpreter::key_insights(text),
        "report_count": session.report_count(),
        "last_report_at": session.last_report_at(),
    })))
}

pub(crate) async fn get_metrics(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state.claim_session()?;
    Ok(Json(json!(session.metrics_display())))
}

pub(crate) async fn get_session(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let session = state.claim_session()?;
    Ok(Json(json!({
        "has_report": session.has_report(),
        "report_count": session.report_count(),
        "last_report_at": session.last_report_at(),
        "transcript_len": session.transcript().len(),
    })))
}

fn http_status(category: StatusCategory) -> StatusCode {
    match category {
        StatusCategory::Success => StatusCode::OK,
        StatusCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        StatusCategory::ServerError
        | StatusCategory::NotFound
        | StatusCategory::OtherError
        | StatusCategory::ConnectionError => StatusCode::BAD_GATEWAY,
    }
}

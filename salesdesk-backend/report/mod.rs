pub mod interpreter;
pub mod webhook;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::session::Session;
use interpreter::ReportResponse;
use webhook::WebhookClient;

/// Deal statuses the workflow can filter on. Serialized exactly as the
/// workflow expects them: `"Won"`, `"Closed"`, `"Lost"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum DealStatus {
    #[serde(alias = "won")]
    Won,
    #[serde(alias = "closed")]
    Closed,
    #[serde(alias = "lost")]
    Lost,
}

pub fn default_deal_statuses() -> Vec<DealStatus> {
    vec![DealStatus::Won, DealStatus::Closed]
}

/// Report period selector. Presets are resolved against "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
pub enum PeriodPreset {
    #[default]
    #[serde(rename = "last_7_days")]
    #[value(name = "last-7-days")]
    LastSevenDays,
    #[serde(rename = "last_30_days")]
    #[value(name = "last-30-days")]
    LastThirtyDays,
    #[serde(rename = "custom")]
    Custom,
}

impl PeriodPreset {
    /// Resolve the preset to a concrete `(start, end)` range.
    ///
    /// A custom range with a missing bound falls back to the last-7-days
    /// bound for that side.
    pub fn resolve(
        self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> (NaiveDate, NaiveDate) {
        let back = |days: u64| today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        match self {
            PeriodPreset::LastSevenDays => (back(7), today),
            PeriodPreset::LastThirtyDays => (back(30), today),
            PeriodPreset::Custom => (start.unwrap_or_else(|| back(7)), end.unwrap_or(today)),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ReportError {
    #[error("end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("minimum deal value must be a non-negative number, got {0}")]
    InvalidMinDealValue(f64),
}

/// One report submission. Built fresh per request through [`ReportRequest::new`],
/// which enforces `start <= end` and a non-negative minimum deal value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_deal_value: f64,
    deal_status: Vec<DealStatus>,
    target_channel: String,
}

impl ReportRequest {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        min_deal_value: f64,
        deal_status: Vec<DealStatus>,
        target_channel: String,
    ) -> Result<Self, ReportError> {
        if end_date < start_date {
            return Err(ReportError::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }
        if !min_deal_value.is_finite() || min_deal_value < 0.0 {
            return Err(ReportError::InvalidMinDealValue(min_deal_value));
        }

        // Multi-select semantics: keep first occurrence, preserve order.
        let mut statuses = Vec::with_capacity(deal_status.len());
        for status in deal_status {
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }

        Ok(Self {
            start_date,
            end_date,
            min_deal_value,
            deal_status: statuses,
            target_channel,
        })
    }

    pub fn target_channel(&self) -> &str {
        &self.target_channel
    }

    pub fn payload(&self) -> WebhookPayload {
        WebhookPayload {
            start_date: self.start_date.format("%Y-%m-%d").to_string(),
            end_date: self.end_date.format("%Y-%m-%d").to_string(),
            min_deal_value: self.min_deal_value,
            deal_status: self.deal_status.clone(),
            slack_channel: self.target_channel.clone(),
        }
    }
}

/// Request body sent to the automation webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub start_date: String,
    pub end_date: String,
    pub min_deal_value: f64,
    pub deal_status: Vec<DealStatus>,
    pub slack_channel: String,
}

/// Run one report generation against the webhook and fold the outcome into
/// the session.
///
/// The transcript is cleared up front: a new generation always starts a new
/// conversation. The stored report text and the counter only change when the
/// webhook answers 200 with a non-empty message text.
pub async fn generate(
    session: &mut Session,
    client: &dyn WebhookClient,
    request: &ReportRequest,
) -> ReportResponse {
    session.begin_report();

    let payload = request.payload();
    tracing::info!(
        endpoint = %client.endpoint(),
        start_date = %payload.start_date,
        end_date = %payload.end_date,
        channel = %payload.slack_channel,
        "triggering report workflow"
    );

    let response = match client.send(&payload).await {
        Ok(reply) => interpreter::interpret(reply.status, &reply.body, request.target_channel()),
        Err(e) => {
            tracing::warn!(error = %e, "report webhook call failed");
            ReportResponse::from_transport_error(&e)
        }
    };

    if let Some(text) = &response.message_text {
        session.record_report(text.clone());
        tracing::info!(
            report_count = session.report_count(),
            channel = response.channel_echo.as_deref().unwrap_or_default(),
            "report generated"
        );
    } else {
        tracing::info!(
            category = ?response.status_category,
            http_status = ?response.http_status,
            "report workflow returned no message text"
        );
    }

    response
}

#[cfg(test)]
mod tests;

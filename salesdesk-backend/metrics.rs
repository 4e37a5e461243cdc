//! Lossy extraction of headline figures from free-form report text.
//!
//! The report format is a soft convention of the upstream workflow, not a
//! contract, so nothing here is validated. Fallback table:
//!
//! | figure           | line must contain                 | pattern      | default |
//! |------------------|-----------------------------------|--------------|---------|
//! | `deal_count`     | `Won Deals:` or `Closed Deals:`   | first `\d+`  | `0`     |
//! | `revenue`        | `Latest:` (up to the first `|`)   | first `\d+`  | -       |
//! | `revenue` (else) | `Closed Revenue:`                 | first `\d+`  | `0`     |
//! | `week_over_week` | `WoW:`                            | `[+-]?\d+%`  | `"0%"`  |
//!
//! The first qualifying line that yields a match wins.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+%").expect("valid regex"));

pub const DEFAULT_WEEK_OVER_WEEK: &str = "0%";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
    pub deal_count: u64,
    pub revenue: u64,
    pub week_over_week: String,
}

impl Default for DerivedMetrics {
    fn default() -> Self {
        Self {
            deal_count: 0,
            revenue: 0,
            week_over_week: DEFAULT_WEEK_OVER_WEEK.to_string(),
        }
    }
}

impl DerivedMetrics {
    /// `$12,500`
    pub fn revenue_display(&self) -> String {
        format!("${}", group_thousands(self.revenue))
    }

    pub fn deal_count_display(&self) -> String {
        group_thousands(self.deal_count)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScrapeError {
    #[error("{figure} figure out of range in line: {line}")]
    OutOfRange { figure: &'static str, line: String },
}

/// What the metrics panel should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MetricsDisplay {
    /// No report generated yet.
    Empty,
    Metrics {
        report_count: u64,
        metrics: DerivedMetrics,
        revenue_display: String,
    },
    /// The report text could not be scanned; only the counter is trustworthy.
    Degraded {
        report_count: u64,
        status: &'static str,
        last_report_at: Option<DateTime<Utc>>,
    },
}

/// Re-scan the stored report for the metrics panel. Never fails: scrape
/// errors turn into [`MetricsDisplay::Degraded`].
pub fn display(
    report_text: Option<&str>,
    report_count: u64,
    last_report_at: Option<DateTime<Utc>>,
) -> MetricsDisplay {
    let Some(text) = report_text.filter(|t| !t.is_empty()) else {
        return MetricsDisplay::Empty;
    };

    match scrape(text) {
        Ok(metrics) => MetricsDisplay::Metrics {
            report_count,
            revenue_display: metrics.revenue_display(),
            metrics,
        },
        Err(e) => {
            tracing::warn!(error = %e, "metrics scrape failed, showing minimal stats");
            MetricsDisplay::Degraded {
                report_count,
                status: "Active",
                last_report_at,
            }
        }
    }
}

pub fn scrape(text: &str) -> Result<DerivedMetrics, ScrapeError> {
    let mut deal_count = None;
    let mut latest_revenue = None;
    let mut closed_revenue = None;
    let mut week_over_week = None;

    for line in text.lines() {
        if deal_count.is_none() && (line.contains("Won Deals:") || line.contains("Closed Deals:")) {
            deal_count = first_number(line, "deal count")?;
        }

        if let Some((_, after)) = line.split_once("Latest:") {
            if latest_revenue.is_none() {
                let current = after.split('|').next().unwrap_or_default();
                latest_revenue = first_number(current, "revenue")?;
            }
        } else if closed_revenue.is_none() && line.contains("Closed Revenue:") {
            closed_revenue = first_number(line, "revenue")?;
        }

        if week_over_week.is_none() && line.contains("WoW:") {
            week_over_week = PERCENT.find(line).map(|m| m.as_str().to_string());
        }
    }

    Ok(DerivedMetrics {
        deal_count: deal_count.unwrap_or(0),
        revenue: latest_revenue.or(closed_revenue).unwrap_or(0),
        week_over_week: week_over_week.unwrap_or_else(|| DEFAULT_WEEK_OVER_WEEK.to_string()),
    })
}

fn first_number(haystack: &str, figure: &'static str) -> Result<Option<u64>, ScrapeError> {
    let Some(m) = DIGITS.find(haystack) else {
        return Ok(None);
    };
    m.as_str()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ScrapeError::OutOfRange {
            figure,
            line: haystack.trim().to_string(),
        })
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

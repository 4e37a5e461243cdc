use chrono::{DateTime, Utc};

use crate::chat::{ConversationTurn, Role};
use crate::metrics::{self, MetricsDisplay};

/// In-memory state of one interactive session.
///
/// Mutated only through the methods below so that the transcript can never
/// outlive the report it is about and the report counter only moves forward.
#[derive(Debug, Default)]
pub struct Session {
    report_text: Option<String>,
    report_count: u64,
    last_report_at: Option<DateTime<Utc>>,
    transcript: Vec<ConversationTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_text(&self) -> Option<&str> {
        self.report_text.as_deref()
    }

    pub fn has_report(&self) -> bool {
        self.report_text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn report_count(&self) -> u64 {
        self.report_count
    }

    pub fn last_report_at(&self) -> Option<DateTime<Utc>> {
        self.last_report_at
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    /// A new generation was requested: the conversation about the previous
    /// report ends here, whatever the outcome of the generation.
    pub fn begin_report(&mut self) {
        self.transcript.clear();
    }

    /// Store the text of a successfully generated report. Empty text is not
    /// a report and changes nothing.
    pub fn record_report(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.report_text = Some(text);
        self.report_count += 1;
        self.last_report_at = Some(Utc::now());
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Append a turn. Ignored when there is no report to talk about.
    pub(crate) fn push_turn(&mut self, role: Role, content: String) -> bool {
        if !self.has_report() {
            return false;
        }
        self.transcript.push(ConversationTurn { role, content });
        true
    }

    pub fn metrics_display(&self) -> MetricsDisplay {
        metrics::display(self.report_text(), self.report_count, self.last_report_at)
    }
}

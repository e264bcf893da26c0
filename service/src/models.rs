use chrono::{DateTime, Utc};
use event_parser::{IncomingMessage, ParseOutcome, ParseOptions, ValidationSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ParseRequest {
    pub message: IncomingMessage,
    #[serde(default)]
    pub options: ParseOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub messages_parsed: usize,
    pub messages_skipped: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub distinct_origins: Vec<String>,
    pub report: String,
}

impl SessionMeta {
    pub fn from_summary(source: &str, summary: &ValidationSummary) -> Self {
        Self {
            created_at: Utc::now(),
            source: source.to_string(),
            messages_parsed: summary.messages_parsed,
            messages_skipped: summary.messages_skipped,
            error_count: summary.error_count,
            warning_count: summary.warning_count,
            info_count: summary.info_count,
            distinct_origins: summary.distinct_origins.clone(),
            report: summary.report(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub meta: SessionMeta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub issues_only: bool,
}

impl EventsQuery {
    pub fn matches(&self, outcome: &ParseOutcome) -> bool {
        if self.issues_only && !outcome.diagnostics.has_issues() {
            return false;
        }
        match &self.origin {
            Some(origin) => outcome.event.origin.as_deref() == Some(origin.as_str()),
            None => true,
        }
    }
}

/// A stored outcome together with its position in the capture.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub row: u32,
    #[serde(flatten)]
    pub outcome: ParseOutcome,
}

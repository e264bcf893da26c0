use crate::event::ParseOutcome;
use crate::message::{IncomingMessage, DEVICE_ID_IDENTIFIER, MODULE_ID_IDENTIFIER};
use crate::message_parser::MessageParser;
use crate::options::ParseOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Restricts a validation run to some devices or modules.
///
/// Patterns match exactly, or by prefix when they end in `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFilter {
    pub device_id: Option<String>,
    pub module_id: Option<String>,
}

impl MessageFilter {
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        pattern_matches(self.device_id.as_deref(), message, DEVICE_ID_IDENTIFIER)
            && pattern_matches(self.module_id.as_deref(), message, MODULE_ID_IDENTIFIER)
    }
}

fn pattern_matches(pattern: Option<&str>, message: &IncomingMessage, key: &str) -> bool {
    let pattern = match pattern {
        Some(pattern) => pattern,
        None => return true,
    };
    let value = match message.annotation_text(key) {
        Ok(value) => value,
        Err(_) => return false,
    };
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => value == pattern,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub messages_parsed: usize,
    pub messages_skipped: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub distinct_origins: Vec<String>,
    pub outcomes: Vec<ParseOutcome>,
}

impl ValidationSummary {
    pub fn report(&self) -> String {
        if self.error_count + self.warning_count + self.info_count == 0 {
            return "No errors detected".to_string();
        }
        format!(
            "Detected {} errors, {} warnings and {} info entries across {} messages",
            self.error_count, self.warning_count, self.info_count, self.messages_parsed
        )
    }
}

/// Parses every message that passes `filter`, each with its own diagnostics.
pub fn validate_messages<I>(
    parser: &MessageParser,
    messages: I,
    options: &ParseOptions,
    filter: &MessageFilter,
) -> ValidationSummary
where
    I: IntoIterator<Item = IncomingMessage>,
{
    let mut summary = ValidationSummary::default();
    let mut origins = BTreeSet::new();

    for message in messages {
        if !filter.matches(&message) {
            summary.messages_skipped += 1;
            continue;
        }

        let outcome = parser.parse_message(&message, options);
        summary.messages_parsed += 1;
        summary.error_count += outcome.diagnostics.errors.len();
        summary.warning_count += outcome.diagnostics.warnings.len();
        summary.info_count += outcome.diagnostics.info.len();
        if let Some(origin) = &outcome.event.origin {
            origins.insert(origin.clone());
        }
        summary.outcomes.push(outcome);
    }

    summary.distinct_origins = origins.into_iter().collect();
    debug!("Skipped {} messages by filter", summary.messages_skipped);
    info!(
        "Validated {} messages from {} devices: {}",
        summary.messages_parsed,
        summary.distinct_origins.len(),
        summary.report()
    );

    summary
}

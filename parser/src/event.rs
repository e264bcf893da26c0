use crate::types::Diagnostics;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Map<String, Value>>,
}

impl EventProperties {
    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.application.is_none()
    }
}

/// Structured view of one telemetry message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "EventProperties::is_empty")]
    pub properties: EventProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Map<String, Value>>,
}

/// Result of parsing one message: the event and what was wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub event: ParsedEvent,
    pub diagnostics: Diagnostics,
}

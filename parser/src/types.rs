use crate::options::PropertyGroup;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors at the fallible edges of the crate: reading captures and
/// interpreting caller-supplied options.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid CSV column '{column}': {reason}")]
    InvalidColumn { column: &'static str, reason: String },
    #[error("Invalid message at index {index}: {source}")]
    InvalidMessage {
        index: usize,
        source: serde_json::Error,
    },
    #[error("Unknown property group: {0}")]
    UnknownPropertyGroup(String),
    #[error("Unable to detect capture format")]
    UndetectableFormat,
}

/// Failure to turn a single AMQP value into text or JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("'{key}' is not present")]
    Missing { key: String },
    #[error("'{key}' does not hold text")]
    NotText { key: String },
    #[error("'{key}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        key: String,
        source: std::str::Utf8Error,
    },
    #[error("'{key}' holds an unrepresentable timestamp: {millis}")]
    InvalidTimestamp { key: String, millis: i64 },
    #[error("'{key}' holds a non-finite number")]
    NonFinite { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

/// A recoverable problem found while parsing one message.
///
/// Every variant carries enough context to be read on its own once it has
/// been flattened into a [`Diagnostics`] list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseIssue {
    #[error("Device id not found in message: {message}")]
    DeviceIdMissing { message: String },
    #[error("Failed to decode system properties. Device: '{origin}'. Reason: {reason}")]
    SystemPropertiesUndecodable { origin: String, reason: DecodeError },
    #[error("No encoding found for message from device '{origin}'. Expected encoding 'utf-8' to be present in message header.")]
    EncodingMissing { origin: String },
    #[error("Unsupported encoding detected: '{encoding}'. The currently supported encodings are: {supported}. Device: '{origin}'")]
    UnsupportedEncoding {
        origin: String,
        encoding: String,
        supported: String,
    },
    #[error("Content type not supported. Content type must be application/json. Device: '{origin}'. Expected: application/json, Actual: {content_type}")]
    UnsupportedContentType { origin: String, content_type: String },
    #[error("Content type '{hint}' requested for device '{origin}' overrides message content type '{declared}'")]
    ContentTypeOverridden {
        origin: String,
        hint: String,
        declared: String,
    },
    #[error("Unable to parse interface name from message. Device: '{origin}'. Reason: {reason}. Message: {message}")]
    InterfaceNameMissing {
        origin: String,
        reason: DecodeError,
        message: String,
    },
    #[error("Inteface name mismatch. {origin}. Expected: {expected}, Actual: {actual}")]
    InterfaceNameMismatch {
        origin: String,
        expected: String,
        actual: String,
    },
    #[error("Unable to decode payload with encoding '{encoding}'. Device: '{origin}'. Reason: {reason}")]
    PayloadUndecodable {
        origin: String,
        encoding: String,
        reason: String,
    },
    #[error("Invalid JSON format. Device: '{origin}'. Payload: {payload}")]
    InvalidJson { origin: String, payload: String },
    #[error("Unable to decode {group} properties. Device: '{origin}'. Reason: {reason}")]
    PropertyGroupUndecodable {
        group: PropertyGroup,
        origin: String,
        reason: DecodeError,
    },
    #[error("Simulated {severity} injected for device '{origin}'")]
    Simulated { severity: Severity, origin: String },
}

impl ParseIssue {
    pub fn severity(&self) -> Severity {
        match self {
            ParseIssue::UnsupportedContentType { .. }
            | ParseIssue::PropertyGroupUndecodable { .. } => Severity::Warning,
            ParseIssue::ContentTypeOverridden { .. } => Severity::Info,
            ParseIssue::Simulated { severity, .. } => *severity,
            _ => Severity::Error,
        }
    }
}

/// Issues accumulated while parsing a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub info: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: ParseIssue) {
        let text = issue.to_string();
        match issue.severity() {
            Severity::Error => self.errors.push(text),
            Severity::Warning => self.warnings.push(text),
            Severity::Info => self.info.push(text),
        }
    }

    /// True when there is anything at all to report, info included.
    pub fn has_issues(&self) -> bool {
        !(self.errors.is_empty() && self.warnings.is_empty() && self.info.is_empty())
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }
}

/// Label used for the device in diagnostic text when the id is unknown.
pub(crate) fn describe_origin(origin: Option<&str>) -> String {
    origin.unwrap_or("<unknown>").to_string()
}

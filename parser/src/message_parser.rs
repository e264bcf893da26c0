use crate::event::{EventProperties, ParseOutcome, ParsedEvent};
use crate::message::{
    decode_map, IncomingMessage, DEVICE_ID_IDENTIFIER, INTERFACE_NAME_IDENTIFIER,
    MODULE_ID_IDENTIFIER,
};
use crate::options::{ParseOptions, PropertyGroup};
use crate::types::{describe_origin, Diagnostics, ParseIssue, Severity};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

pub const SUPPORTED_ENCODINGS: &[&str] = &["utf-8"];
pub const JSON_CONTENT_TYPE: &str = "application/json";

lazy_static! {
    // Literal backslash escapes, as emitted by some device SDKs inside JSON bodies.
    static ref ESCAPED_LINE_BREAKS: Regex =
        Regex::new(r"(\\r\\n)+|\\r+|\\n+").expect("line break pattern is valid");
}

/// Validates and decodes telemetry messages.
///
/// The parser holds no per-message state: every call to
/// [`MessageParser::parse_message`] returns its own [`Diagnostics`], so one
/// instance can be shared freely between receive loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Device id from the message annotations.
    ///
    /// A missing or undecodable id is recorded as an error and yields `None`.
    pub fn parse_device_id(
        &self,
        message: &IncomingMessage,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        match self.device_id(message) {
            Ok(device_id) => Some(device_id),
            Err(issue) => {
                diagnostics.record(issue);
                None
            }
        }
    }

    /// Parses one message. Problems with the message content never fail the
    /// call; they are reported in the returned diagnostics.
    pub fn parse_message(&self, message: &IncomingMessage, options: &ParseOptions) -> ParseOutcome {
        let mut diagnostics = Diagnostics::new();

        let origin = self.parse_device_id(message, &mut diagnostics);
        let device = describe_origin(origin.as_deref());
        let module = message.annotation_text(MODULE_ID_IDENTIFIER).ok();
        debug!("Parsing message from device '{}'", device);

        let system_properties = self
            .system_properties(message, &device)
            .unwrap_or_else(|issue| {
                diagnostics.record(issue);
                Map::new()
            });

        let encoding = match self.content_encoding(&system_properties, &device) {
            Ok(encoding) => Some(encoding),
            Err(issue) => {
                diagnostics.record(issue);
                None
            }
        };

        let content_type = self.resolve_content_type(options, &system_properties, &device, &mut diagnostics);
        let is_json = match self.content_type(content_type.as_deref(), &device) {
            Ok(()) => true,
            Err(issue) => {
                diagnostics.record(issue);
                false
            }
        };

        let interface = if options.pnp_context {
            self.parse_interface_name(message, options.interface_name.as_deref(), &device, &mut diagnostics)
        } else {
            None
        };

        let payload = self.parse_payload(message, encoding.as_deref(), is_json, &device, &mut diagnostics);

        let mut event = ParsedEvent {
            origin,
            module,
            interface,
            payload,
            properties: EventProperties::default(),
            annotations: None,
        };
        self.select_properties(&mut event, message, system_properties, options, &device, &mut diagnostics);

        if options.simulate_errors {
            for severity in [Severity::Error, Severity::Warning, Severity::Info] {
                diagnostics.record(ParseIssue::Simulated {
                    severity,
                    origin: device.clone(),
                });
            }
        }

        debug!(
            "Parsed message from device '{}': {} errors, {} warnings, {} info",
            device,
            diagnostics.errors.len(),
            diagnostics.warnings.len(),
            diagnostics.info.len()
        );

        ParseOutcome { event, diagnostics }
    }

    /// Emits diagnostics through `tracing`.
    pub fn write_logs(&self, diagnostics: &Diagnostics) {
        if !diagnostics.has_issues() {
            debug!("No errors detected");
            return;
        }
        for entry in &diagnostics.errors {
            error!("{}", entry);
        }
        for entry in &diagnostics.warnings {
            warn!("{}", entry);
        }
        for entry in &diagnostics.info {
            info!("{}", entry);
        }
    }

    fn device_id(&self, message: &IncomingMessage) -> Result<String, ParseIssue> {
        message
            .annotation_text(DEVICE_ID_IDENTIFIER)
            .map_err(|_| ParseIssue::DeviceIdMissing {
                message: message.to_string(),
            })
    }

    fn system_properties(
        &self,
        message: &IncomingMessage,
        device: &str,
    ) -> Result<Map<String, Value>, ParseIssue> {
        message
            .properties
            .decode()
            .map_err(|reason| ParseIssue::SystemPropertiesUndecodable {
                origin: device.to_string(),
                reason,
            })
    }

    fn content_encoding(
        &self,
        system_properties: &Map<String, Value>,
        device: &str,
    ) -> Result<String, ParseIssue> {
        let encoding = system_properties
            .get("content_encoding")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|encoding| !encoding.is_empty())
            .ok_or_else(|| ParseIssue::EncodingMissing {
                origin: device.to_string(),
            })?;

        if SUPPORTED_ENCODINGS
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(encoding))
        {
            Ok(encoding.to_ascii_lowercase())
        } else {
            Err(ParseIssue::UnsupportedEncoding {
                origin: device.to_string(),
                encoding: encoding.to_string(),
                supported: format!("{:?}", SUPPORTED_ENCODINGS),
            })
        }
    }

    /// Content type to validate against: the caller's hint when given,
    /// otherwise the one declared on the message.
    fn resolve_content_type(
        &self,
        options: &ParseOptions,
        system_properties: &Map<String, Value>,
        device: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let declared = system_properties
            .get("content_type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|content_type| !content_type.is_empty());
        let hint = options
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|content_type| !content_type.is_empty());

        match (hint, declared) {
            (Some(hint), Some(declared)) => {
                if !hint.eq_ignore_ascii_case(declared) {
                    diagnostics.record(ParseIssue::ContentTypeOverridden {
                        origin: device.to_string(),
                        hint: hint.to_string(),
                        declared: declared.to_string(),
                    });
                }
                Some(hint.to_string())
            }
            (Some(hint), None) => Some(hint.to_string()),
            (None, declared) => declared.map(str::to_string),
        }
    }

    fn content_type(&self, content_type: Option<&str>, device: &str) -> Result<(), ParseIssue> {
        let actual = content_type.unwrap_or("");
        let media_type = actual.split(';').next().unwrap_or("").trim();
        if media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            return Ok(());
        }
        Err(ParseIssue::UnsupportedContentType {
            origin: device.to_string(),
            content_type: if actual.is_empty() {
                "None".to_string()
            } else {
                actual.to_string()
            },
        })
    }

    /// Interface name found on the message. A mismatch with `expected` is
    /// recorded but the message value is still returned.
    fn parse_interface_name(
        &self,
        message: &IncomingMessage,
        expected: Option<&str>,
        device: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        let actual = match message.annotation_text(INTERFACE_NAME_IDENTIFIER) {
            Ok(actual) => actual,
            Err(reason) => {
                diagnostics.record(ParseIssue::InterfaceNameMissing {
                    origin: device.to_string(),
                    reason,
                    message: message.to_string(),
                });
                return None;
            }
        };

        if let Some(expected) = expected {
            if expected != actual {
                diagnostics.record(ParseIssue::InterfaceNameMismatch {
                    origin: device.to_string(),
                    expected: expected.to_string(),
                    actual: actual.clone(),
                });
            }
        }

        Some(actual)
    }

    fn parse_payload(
        &self,
        message: &IncomingMessage,
        encoding: Option<&str>,
        is_json: bool,
        device: &str,
        diagnostics: &mut Diagnostics,
    ) -> Value {
        let encoding = match encoding {
            Some(encoding) => encoding,
            None => return Value::String(message.body.first_chunk_lossy()),
        };

        let text = self.decode_body(message, encoding, device).unwrap_or_else(|issue| {
            diagnostics.record(issue);
            String::from_utf8_lossy(&message.body.concat()).into_owned()
        });

        if !is_json {
            return Value::String(text);
        }

        let normalized = ESCAPED_LINE_BREAKS.replace_all(&text, "").into_owned();
        match serde_json::from_str::<Value>(&normalized) {
            Ok(payload) => payload,
            Err(_) => {
                diagnostics.record(ParseIssue::InvalidJson {
                    origin: device.to_string(),
                    payload: normalized.clone(),
                });
                Value::String(normalized)
            }
        }
    }

    fn decode_body(
        &self,
        message: &IncomingMessage,
        encoding: &str,
        device: &str,
    ) -> Result<String, ParseIssue> {
        String::from_utf8(message.body.concat()).map_err(|e| ParseIssue::PayloadUndecodable {
            origin: device.to_string(),
            encoding: encoding.to_string(),
            reason: e.utf8_error().to_string(),
        })
    }

    fn select_properties(
        &self,
        event: &mut ParsedEvent,
        message: &IncomingMessage,
        system_properties: Map<String, Value>,
        options: &ParseOptions,
        device: &str,
        diagnostics: &mut Diagnostics,
    ) {
        let selected = &options.properties;

        if selected.contains(PropertyGroup::System) && !system_properties.is_empty() {
            event.properties.system = Some(system_properties);
        }

        if selected.contains(PropertyGroup::Application) {
            match decode_map(&message.application_properties) {
                Ok(application) => event.properties.application = Some(application),
                Err(reason) => diagnostics.record(ParseIssue::PropertyGroupUndecodable {
                    group: PropertyGroup::Application,
                    origin: device.to_string(),
                    reason,
                }),
            }
        }

        if selected.contains(PropertyGroup::Annotations) {
            match decode_map(&message.annotations) {
                Ok(annotations) => event.annotations = Some(annotations),
                Err(reason) => diagnostics.record(ParseIssue::PropertyGroupUndecodable {
                    group: PropertyGroup::Annotations,
                    origin: device.to_string(),
                    reason,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AmqpValue;
    use crate::options::PropertyGroups;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs(f: impl FnOnce()) -> Vec<String> {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        output.lines().map(|line| line.trim_start().to_string()).collect()
    }

    fn json_message(device_id: &str, body: &str) -> IncomingMessage {
        IncomingMessage::new(body)
            .with_device_id(device_id)
            .with_content_encoding("utf-8")
            .with_content_type("application/json")
    }

    #[test]
    fn test_parse_device_id() {
        let parser = MessageParser::new();
        let mut diagnostics = Diagnostics::new();

        let message = json_message("dev-1", "{}");
        assert_eq!(
            parser.parse_device_id(&message, &mut diagnostics).as_deref(),
            Some("dev-1")
        );
        assert!(diagnostics.errors.is_empty());
    }

    #[test]
    fn test_missing_device_id() {
        let parser = MessageParser::new();
        let mut diagnostics = Diagnostics::new();
        let message = IncomingMessage::new("{}").with_content_encoding("utf-8");

        assert!(parser.parse_device_id(&message, &mut diagnostics).is_none());
        assert_eq!(diagnostics.errors.len(), 1);
        assert!(diagnostics.errors[0].starts_with("Device id not found in message: {annotations: {}"));
    }

    #[test]
    fn test_non_utf8_device_id_is_missing() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new("{}")
            .with_annotation(DEVICE_ID_IDENTIFIER, AmqpValue::Binary(vec![0xc3, 0x28]))
            .with_content_encoding("utf-8")
            .with_content_type("application/json");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert!(outcome.event.origin.is_none());
        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert_eq!(outcome.event.payload, json!({}));
    }

    #[test]
    fn test_json_payload_without_issues() {
        let parser = MessageParser::new();
        let outcome = parser.parse_message(&json_message("dev-1", r#"{"Bool": true}"#), &ParseOptions::default());

        assert_eq!(outcome.event.payload, json!({"Bool": true}));
        assert!(outcome.diagnostics.errors.is_empty());
        assert!(outcome.diagnostics.warnings.is_empty());
        assert!(outcome.event.interface.is_none());
    }

    #[test]
    fn test_missing_encoding_still_returns_payload() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new(r#"{"Temp": 42}"#)
            .with_device_id("dev-1")
            .with_content_type("application/json");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert!(outcome.diagnostics.errors[0].contains("encoding"));
        assert!(outcome.diagnostics.errors[0].contains("dev-1"));
        assert_eq!(outcome.event.payload, json!(r#"{"Temp": 42}"#));
    }

    #[test]
    fn test_unsupported_encoding() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new("{}")
            .with_device_id("dev-1")
            .with_content_type("application/json")
            .with_content_encoding("utf-16");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert!(outcome.diagnostics.errors[0].starts_with("Unsupported encoding detected: 'utf-16'"));
        assert_eq!(outcome.event.payload, json!("{}"));
    }

    #[test]
    fn test_encoding_match_is_case_insensitive() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new("[1, 2]")
            .with_device_id("dev-1")
            .with_content_type("Application/JSON")
            .with_content_encoding("UTF-8");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert!(!outcome.diagnostics.has_issues());
        assert_eq!(outcome.event.payload, json!([1, 2]));
    }

    #[test]
    fn test_non_json_content_type_warns_and_keeps_raw_string() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new(r#"{"Temp": 42}"#)
            .with_device_id("dev-1")
            .with_content_encoding("utf-8")
            .with_content_type("text/plain");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert!(outcome.diagnostics.errors.is_empty());
        assert_eq!(outcome.diagnostics.warnings.len(), 1);
        assert!(outcome.diagnostics.warnings[0].contains("Content type"));
        assert!(outcome.diagnostics.warnings[0].contains("Actual: text/plain"));
        assert_eq!(outcome.event.payload, json!(r#"{"Temp": 42}"#));
    }

    #[test]
    fn test_missing_content_type_warns() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new("hello")
            .with_device_id("dev-1")
            .with_content_encoding("utf-8");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.diagnostics.warnings.len(), 1);
        assert!(outcome.diagnostics.warnings[0].contains("Actual: None"));
        assert_eq!(outcome.event.payload, json!("hello"));
    }

    #[test]
    fn test_content_type_parameters_are_ignored() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new(r#"{"a": 1}"#)
            .with_device_id("dev-1")
            .with_content_encoding("utf-8")
            .with_content_type("application/json; charset=utf-8");

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert!(outcome.diagnostics.warnings.is_empty());
        assert_eq!(outcome.event.payload, json!({"a": 1}));
    }

    #[test]
    fn test_content_type_hint_overrides_message() {
        let parser = MessageParser::new();
        let message = IncomingMessage::new(r#"{"a": 1}"#)
            .with_device_id("dev-1")
            .with_content_encoding("utf-8")
            .with_content_type("text/plain");
        let options = ParseOptions::default().with_content_type("application/json");

        let outcome = parser.parse_message(&message, &options);

        assert!(outcome.diagnostics.warnings.is_empty());
        assert_eq!(outcome.diagnostics.info.len(), 1);
        assert_eq!(outcome.event.payload, json!({"a": 1}));
    }

    #[test]
    fn test_invalid_json_falls_back_to_stripped_string() {
        let parser = MessageParser::new();
        let outcome = parser.parse_message(
            &json_message("dev-1", r#"{"Temp": 4\r\n2"#),
            &ParseOptions::default(),
        );

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert!(outcome.diagnostics.errors[0].contains("Invalid JSON format"));
        assert!(outcome.diagnostics.errors[0].contains("dev-1"));
        assert_eq!(outcome.event.payload, json!(r#"{"Temp": 42"#));
    }

    #[test]
    fn test_escaped_line_breaks_are_stripped_before_json_parse() {
        let parser = MessageParser::new();
        let outcome = parser.parse_message(
            &json_message("dev-1", r#"{\r\n"a": 1,\n\n"b":\r 2}"#),
            &ParseOptions::default(),
        );

        assert!(outcome.diagnostics.errors.is_empty());
        assert_eq!(outcome.event.payload, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_chunked_body_is_concatenated() {
        let parser = MessageParser::new();
        let mut message = json_message("dev-1", "");
        message.body = crate::MessageBody::from_chunks(vec![b"{\"Temp\":".to_vec(), b" 42}".to_vec()]);

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.event.payload, json!({"Temp": 42}));
    }

    #[test]
    fn test_undecodable_body_is_reported_and_lossy() {
        let parser = MessageParser::new();
        let mut message = json_message("dev-1", "");
        message.body = crate::MessageBody::from(vec![b'"', 0xff, b'"']);

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert!(outcome.diagnostics.errors[0].starts_with("Unable to decode payload"));
        assert_eq!(outcome.event.payload, json!("\u{fffd}"));
    }

    #[test]
    fn test_interface_mismatch_keeps_actual_value() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", "{}")
            .with_annotation(INTERFACE_NAME_IDENTIFIER, AmqpValue::binary("urn:actual"));
        let options = ParseOptions::default().with_pnp(Some("urn:expected"));

        let outcome = parser.parse_message(&message, &options);

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert_eq!(
            outcome.diagnostics.errors[0],
            "Inteface name mismatch. dev-1. Expected: urn:expected, Actual: urn:actual"
        );
        assert_eq!(outcome.event.interface.as_deref(), Some("urn:actual"));
    }

    #[test]
    fn test_interface_missing_in_pnp_context() {
        let parser = MessageParser::new();
        let options = ParseOptions::default().with_pnp(Some("urn:expected"));

        let outcome = parser.parse_message(&json_message("dev-1", "{}"), &options);

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert!(outcome.diagnostics.errors[0].contains("dev-1"));
        assert!(outcome.diagnostics.errors[0].contains("Message: {annotations:"));
        assert!(outcome.event.interface.is_none());
    }

    #[test]
    fn test_interface_ignored_outside_pnp_context() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", "{}")
            .with_annotation(INTERFACE_NAME_IDENTIFIER, AmqpValue::binary("urn:actual"));

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert!(outcome.event.interface.is_none());
    }

    #[test]
    fn test_diagnostics_are_fresh_per_call() {
        let parser = MessageParser::new();
        let bad = IncomingMessage::new("{").with_content_type("application/json");
        let good = json_message("dev-2", r#"{"ok": 1}"#);

        let first = parser.parse_message(&bad, &ParseOptions::default());
        let second = parser.parse_message(&good, &ParseOptions::default());

        assert!(first.diagnostics.has_issues());
        assert!(!second.diagnostics.has_issues());
    }

    #[test]
    fn test_application_group_only() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", "{}")
            .with_application_property("alert", AmqpValue::binary("high"));
        let options = ParseOptions::default().with_properties(PropertyGroups::parse(["app"]).unwrap());

        let outcome = parser.parse_message(&message, &options);

        assert_eq!(
            outcome.event.properties.application,
            Some(json!({"alert": "high"}).as_object().unwrap().clone())
        );
        assert!(outcome.event.properties.system.is_none());
        assert!(outcome.event.annotations.is_none());

        let value = serde_json::to_value(&outcome.event).unwrap();
        assert!(value["properties"].get("system").is_none());
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn test_all_groups() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", "{}")
            .with_application_property("alert", AmqpValue::binary("high"));
        let options = ParseOptions::default().with_properties(PropertyGroups::all());

        let outcome = parser.parse_message(&message, &options);

        let system = outcome.event.properties.system.unwrap();
        assert_eq!(system["content_type"], "application/json");
        assert!(outcome.event.properties.application.is_some());
        assert_eq!(
            outcome.event.annotations.unwrap()[DEVICE_ID_IDENTIFIER],
            "dev-1"
        );
    }

    #[test]
    fn test_undecodable_group_is_warned_and_omitted() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", "{}")
            .with_application_property("bad", AmqpValue::Binary(vec![0xff]));
        let options = ParseOptions::default().with_properties(PropertyGroups::all());

        let outcome = parser.parse_message(&message, &options);

        assert!(outcome.diagnostics.errors.is_empty());
        assert_eq!(outcome.diagnostics.warnings.len(), 1);
        assert!(outcome.diagnostics.warnings[0].contains("application properties"));
        assert!(outcome.event.properties.application.is_none());
        assert!(outcome.event.properties.system.is_some());
    }

    #[test]
    fn test_undecodable_system_properties() {
        let parser = MessageParser::new();
        let mut message = json_message("dev-1", "{}");
        message.properties.message_id = Some(AmqpValue::Binary(vec![0xff]));
        let options = ParseOptions::default().with_properties(PropertyGroups::all());

        let outcome = parser.parse_message(&message, &options);

        assert!(outcome.diagnostics.errors[0].starts_with("Failed to decode system properties"));
        assert!(outcome.event.properties.system.is_none());
        assert_eq!(outcome.event.payload, json!("{}"));
    }

    #[test]
    fn test_module_id_is_reported() {
        let parser = MessageParser::new();
        let message = json_message("edge-1", "{}")
            .with_annotation(MODULE_ID_IDENTIFIER, AmqpValue::binary("filter"));

        let outcome = parser.parse_message(&message, &ParseOptions::default());

        assert_eq!(outcome.event.module.as_deref(), Some("filter"));
    }

    #[test]
    fn test_write_logs_uses_severity_levels() {
        let parser = MessageParser::new();
        let diagnostics = Diagnostics {
            errors: vec!["bad encoding".into()],
            warnings: vec!["odd content type".into()],
            info: vec!["hint applied".into()],
        };

        let lines = capture_logs(|| parser.write_logs(&diagnostics));

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ERROR") && lines[0].ends_with("bad encoding"));
        assert!(lines[1].starts_with("WARN") && lines[1].ends_with("odd content type"));
        assert!(lines[2].starts_with("INFO") && lines[2].ends_with("hint applied"));
    }

    #[test]
    fn test_write_logs_without_issues() {
        let parser = MessageParser::new();

        let lines = capture_logs(|| parser.write_logs(&Diagnostics::new()));

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("DEBUG"));
        assert!(lines[0].ends_with("No errors detected"));
    }

    #[test]
    fn test_simulated_errors() {
        let parser = MessageParser::new();
        let options = ParseOptions::default().with_simulated_errors();

        let outcome = parser.parse_message(&json_message("dev-1", "{}"), &options);

        assert_eq!(outcome.diagnostics.errors.len(), 1);
        assert_eq!(outcome.diagnostics.warnings.len(), 1);
        assert_eq!(outcome.diagnostics.info.len(), 1);
        assert!(outcome.diagnostics.errors[0].starts_with("Simulated error"));
    }

    #[test]
    fn test_end_to_end_with_system_and_application_properties() {
        let parser = MessageParser::new();
        let message = json_message("dev-1", r#"{"Temp": 42}"#)
            .with_application_property("unit", AmqpValue::binary("C"));
        let options = ParseOptions::default().with_properties(PropertyGroups::parse(["sys", "app"]).unwrap());

        let outcome = parser.parse_message(&message, &options);

        assert!(outcome.diagnostics.errors.is_empty());
        assert_eq!(
            serde_json::to_value(&outcome.event).unwrap(),
            json!({
                "origin": "dev-1",
                "payload": {"Temp": 42},
                "properties": {
                    "system": {"content_encoding": "utf-8", "content_type": "application/json"},
                    "application": {"unit": "C"}
                }
            })
        );
    }
}

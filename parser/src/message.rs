//! Transport-level shape of a received telemetry message.
//!
//! The model mirrors what an AMQP receiver hands over: broker annotations,
//! user-defined application properties, the standard message properties and
//! a body made of one or more data sections. It deserializes from the JSON
//! form used by capture files and the HTTP service.

use crate::types::DecodeError;
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const DEVICE_ID_IDENTIFIER: &str = "iothub-connection-device-id";
pub const MODULE_ID_IDENTIFIER: &str = "iothub-connection-module-id";
pub const INTERFACE_NAME_IDENTIFIER: &str = "iothub-interface-name";

/// A value carried in annotations or properties.
///
/// JSON form: strings are text, arrays of byte values are raw binary and
/// `{"timestamp": <ms since epoch>}` is an AMQP timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmqpValue {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Timestamp { timestamp: i64 },
    String(String),
    Binary(Vec<u8>),
}

impl AmqpValue {
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        AmqpValue::Binary(bytes.into())
    }

    /// Text content of a string or UTF-8 binary value.
    pub fn as_text(&self, key: &str) -> Result<&str, DecodeError> {
        match self {
            AmqpValue::String(text) => Ok(text),
            AmqpValue::Binary(bytes) => {
                std::str::from_utf8(bytes).map_err(|source| DecodeError::InvalidUtf8 {
                    key: key.to_string(),
                    source,
                })
            }
            _ => Err(DecodeError::NotText {
                key: key.to_string(),
            }),
        }
    }

    pub fn decode(&self, key: &str) -> Result<Value, DecodeError> {
        match self {
            AmqpValue::Null => Ok(Value::Null),
            AmqpValue::Bool(b) => Ok(Value::Bool(*b)),
            AmqpValue::Long(n) => Ok(Value::Number((*n).into())),
            AmqpValue::Double(n) => Number::from_f64(*n)
                .map(Value::Number)
                .ok_or_else(|| DecodeError::NonFinite {
                    key: key.to_string(),
                }),
            AmqpValue::Timestamp { timestamp } => Utc
                .timestamp_millis_opt(*timestamp)
                .single()
                .map(|at| Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)))
                .ok_or_else(|| DecodeError::InvalidTimestamp {
                    key: key.to_string(),
                    millis: *timestamp,
                }),
            AmqpValue::String(_) | AmqpValue::Binary(_) => {
                self.as_text(key).map(|text| Value::String(text.to_string()))
            }
        }
    }
}

impl fmt::Display for AmqpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmqpValue::Null => f.write_str("None"),
            AmqpValue::Bool(b) => write!(f, "{}", b),
            AmqpValue::Long(n) => write!(f, "{}", n),
            AmqpValue::Double(n) => write!(f, "{}", n),
            AmqpValue::Timestamp { timestamp } => write!(f, "timestamp({})", timestamp),
            AmqpValue::String(text) => write!(f, "'{}'", text),
            AmqpValue::Binary(bytes) => write!(f, "b'{}'", String::from_utf8_lossy(bytes)),
        }
    }
}

/// Decodes every entry of a property map, failing on the first bad value.
pub fn decode_map(map: &BTreeMap<String, AmqpValue>) -> Result<Map<String, Value>, DecodeError> {
    map.iter()
        .map(|(key, value)| value.decode(key).map(|decoded| (key.clone(), decoded)))
        .collect()
}

/// Standard AMQP message properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemProperties {
    pub message_id: Option<AmqpValue>,
    pub user_id: Option<AmqpValue>,
    pub to: Option<AmqpValue>,
    pub subject: Option<AmqpValue>,
    pub reply_to: Option<AmqpValue>,
    pub correlation_id: Option<AmqpValue>,
    pub content_type: Option<AmqpValue>,
    pub content_encoding: Option<AmqpValue>,
    pub absolute_expiry_time: Option<AmqpValue>,
    pub creation_time: Option<AmqpValue>,
}

impl SystemProperties {
    fn entries(&self) -> [(&'static str, Option<&AmqpValue>); 10] {
        [
            ("message_id", self.message_id.as_ref()),
            ("user_id", self.user_id.as_ref()),
            ("to", self.to.as_ref()),
            ("subject", self.subject.as_ref()),
            ("reply_to", self.reply_to.as_ref()),
            ("correlation_id", self.correlation_id.as_ref()),
            ("content_type", self.content_type.as_ref()),
            ("content_encoding", self.content_encoding.as_ref()),
            ("absolute_expiry_time", self.absolute_expiry_time.as_ref()),
            ("creation_time", self.creation_time.as_ref()),
        ]
    }

    /// Decodes the properties that are set; unset and null ones are left out.
    pub fn decode(&self) -> Result<Map<String, Value>, DecodeError> {
        let mut decoded = Map::new();
        for (key, value) in self.entries() {
            match value {
                None | Some(AmqpValue::Null) => {}
                Some(value) => {
                    decoded.insert(key.to_string(), value.decode(key)?);
                }
            }
        }
        Ok(decoded)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBody {
    Text(String),
    Chunks(Vec<String>),
    Bytes(Vec<u8>),
}

/// Message body as a sequence of data sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawBody")]
pub struct MessageBody {
    chunks: Vec<Vec<u8>>,
}

impl From<RawBody> for MessageBody {
    fn from(raw: RawBody) -> Self {
        let chunks = match raw {
            RawBody::Text(text) => vec![text.into_bytes()],
            RawBody::Chunks(chunks) => chunks.into_iter().map(String::into_bytes).collect(),
            RawBody::Bytes(bytes) => vec![bytes],
        };
        Self { chunks }
    }
}

impl MessageBody {
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn concat(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn first_chunk_lossy(&self) -> String {
        self.chunks
            .first()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .unwrap_or_default()
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self {
            chunks: vec![text.as_bytes().to_vec()],
        }
    }
}

impl From<Vec<u8>> for MessageBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self { chunks: vec![bytes] }
    }
}

/// One received telemetry message.
///
/// `annotations`, `properties` and `body` are required when deserializing;
/// a document without them is not a message at all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncomingMessage {
    pub annotations: BTreeMap<String, AmqpValue>,
    #[serde(default)]
    pub application_properties: BTreeMap<String, AmqpValue>,
    pub properties: SystemProperties,
    pub body: MessageBody,
}

impl IncomingMessage {
    pub fn new(body: impl Into<MessageBody>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: AmqpValue) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    pub fn with_device_id(self, device_id: &str) -> Self {
        self.with_annotation(DEVICE_ID_IDENTIFIER, AmqpValue::binary(device_id))
    }

    pub fn with_application_property(mut self, key: impl Into<String>, value: AmqpValue) -> Self {
        self.application_properties.insert(key.into(), value);
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.properties.content_type = Some(AmqpValue::binary(content_type));
        self
    }

    pub fn with_content_encoding(mut self, encoding: &str) -> Self {
        self.properties.content_encoding = Some(AmqpValue::binary(encoding));
        self
    }

    /// Non-empty text of an annotation.
    pub fn annotation_text(&self, key: &str) -> Result<String, DecodeError> {
        let value = self.annotations.get(key).ok_or_else(|| DecodeError::Missing {
            key: key.to_string(),
        })?;
        let text = value.as_text(key)?;
        if text.is_empty() {
            return Err(DecodeError::Missing {
                key: key.to_string(),
            });
        }
        Ok(text.to_string())
    }
}

impl fmt::Display for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{annotations: {")?;
        for (idx, (key, value)) in self.annotations.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}, properties: {")?;
        let set = self
            .properties
            .entries()
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)));
        for (idx, (key, value)) in set.enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}, body: {} bytes}}", self.body.len())
    }
}

use crate::{
    base_reader::CaptureReader,
    message::{AmqpValue, MODULE_ID_IDENTIFIER},
    IncomingMessage, ParseError,
};
use csv::Reader;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    module_id: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    content_encoding: String,
    body: String,
    #[serde(default)]
    application_properties: String,
    #[serde(default)]
    annotations: String,
}

/// CSV captures: one message per row.
///
/// `application_properties` and `annotations` are JSON-encoded maps; an
/// empty cell means the value is absent.
pub struct CsvReader;

impl CaptureReader for CsvReader {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        let sample = String::from_utf8_lossy(data);
        let header = sample.trim().lines().next().unwrap_or("");

        header.split(',').any(|column| column.trim() == "device_id")
            && header.split(',').any(|column| column.trim() == "body")
    }

    fn read(&self, reader: Box<dyn Read>) -> Result<Vec<IncomingMessage>, ParseError> {
        let mut csv_reader = Reader::from_reader(reader);
        let mut messages = Vec::new();

        for record_result in csv_reader.deserialize::<CsvRecord>() {
            messages.push(into_message(record_result?)?);
        }

        Ok(messages)
    }
}

fn into_message(record: CsvRecord) -> Result<IncomingMessage, ParseError> {
    let mut message = IncomingMessage::new(record.body.as_str());
    message.annotations = json_map(&record.annotations, "annotations")?;
    message.application_properties = json_map(&record.application_properties, "application_properties")?;

    if !record.device_id.is_empty() {
        message = message.with_device_id(&record.device_id);
    }
    if !record.module_id.is_empty() {
        message = message.with_annotation(MODULE_ID_IDENTIFIER, AmqpValue::binary(record.module_id));
    }
    if !record.content_type.is_empty() {
        message = message.with_content_type(&record.content_type);
    }
    if !record.content_encoding.is_empty() {
        message = message.with_content_encoding(&record.content_encoding);
    }

    Ok(message)
}

fn json_map(cell: &str, column: &'static str) -> Result<BTreeMap<String, AmqpValue>, ParseError> {
    if cell.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(cell).map_err(|e| ParseError::InvalidColumn {
        column,
        reason: e.to_string(),
    })
}

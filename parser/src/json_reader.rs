use crate::{base_reader::CaptureReader, IncomingMessage, ParseError};
use std::io::Read;
use tracing::{debug, info};

/// JSON captures: a single array of message objects.
pub struct JsonReader;

impl CaptureReader for JsonReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        String::from_utf8_lossy(data).trim_start().starts_with('[')
    }

    fn read(&self, reader: Box<dyn Read>) -> Result<Vec<IncomingMessage>, ParseError> {
        let elements: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        debug!("JSON capture holds {} elements", elements.len());

        let messages = elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| {
                serde_json::from_value(element)
                    .map_err(|source| ParseError::InvalidMessage { index, source })
            })
            .collect::<Result<Vec<IncomingMessage>, _>>()?;

        info!("JSON capture read: {} messages", messages.len());
        Ok(messages)
    }
}

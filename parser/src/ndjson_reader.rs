use crate::{base_reader::CaptureReader, IncomingMessage, ParseError};
use std::io::{BufRead, BufReader, Read};
use tracing::{debug, info};

/// NDJSON captures: one message object per line.
pub struct NdjsonReader;

impl CaptureReader for NdjsonReader {
    fn name(&self) -> &'static str {
        "ndjson"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ndjson", "jsonl"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        let sample = String::from_utf8_lossy(data);
        let trimmed = sample.trim();

        if !trimmed.starts_with('{') {
            return false;
        }

        // No line break: the sample may end inside the first message
        if !trimmed.contains('\n') {
            return true;
        }

        match trimmed.lines().next() {
            Some(first_line) => serde_json::from_str::<serde_json::Value>(first_line)
                .map(|value| value.is_object())
                .unwrap_or(false),
            None => false,
        }
    }

    fn read(&self, reader: Box<dyn Read>) -> Result<Vec<IncomingMessage>, ParseError> {
        let buf_reader = BufReader::new(reader);
        let mut messages = Vec::new();

        for (line_no, line_result) in buf_reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            debug!("Reading NDJSON message on line {}", line_no + 1);
            messages.push(serde_json::from_str(line)?);
        }

        info!("NDJSON capture read: {} messages", messages.len());
        Ok(messages)
    }
}

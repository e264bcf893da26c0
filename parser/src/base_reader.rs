use crate::{IncomingMessage, ParseError};
use std::io::Read;

/// A source of captured telemetry messages in one file format.
/// Takes `Box<dyn Read>` so the trait stays object-safe.
pub trait CaptureReader: Send + Sync {
    /// Short format name, e.g. "ndjson"
    fn name(&self) -> &'static str;

    /// File extensions handled by this reader, without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// Checks whether a leading sample of the data looks like this format
    fn can_read(&self, data: &[u8]) -> bool;

    fn read(&self, reader: Box<dyn Read>) -> Result<Vec<IncomingMessage>, ParseError>;
}

/// Guess the capture format from a leading sample
pub fn detect_format(data: &[u8]) -> FormatHint {
    let sample = String::from_utf8_lossy(data);
    let trimmed = sample.trim();

    if trimmed.starts_with("device_id,") || trimmed.contains(",content_type,") {
        return FormatHint::Csv;
    }

    if trimmed.starts_with('[') {
        return FormatHint::Json;
    }

    // NDJSON: an object per line. A sample without a line break holds one
    // message, possibly cut off by the sample size.
    if trimmed.starts_with('{') {
        let first_line = trimmed.lines().next().unwrap_or("");
        if !trimmed.contains('\n') || first_line.trim_end().ends_with('}') {
            return FormatHint::Ndjson;
        }
    }

    FormatHint::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Csv,
    Ndjson,
    Json,
    Unknown,
}

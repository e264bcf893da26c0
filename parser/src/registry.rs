use crate::base_reader::{detect_format, CaptureReader, FormatHint};
use crate::readers::all_readers;
use crate::{IncomingMessage, ParseError};
use std::io::{Cursor, Read};
use tracing::{debug, error, info, warn};

const SAMPLE_SIZE: usize = 512;

/// Picks a capture reader by name, by file extension or by sniffing content.
pub struct ReaderRegistry {
    readers: Vec<Box<dyn CaptureReader>>,
}

impl ReaderRegistry {
    /// Registry with every reader from [`all_readers`].
    pub fn new() -> Self {
        let readers = all_readers();

        info!(
            "Registered {} capture readers: {}",
            readers.len(),
            readers.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
        );

        Self { readers }
    }

    pub fn register(&mut self, reader: Box<dyn CaptureReader>) {
        info!("Registering custom capture reader: {}", reader.name());
        debug!("Reader supports extensions: {:?}", reader.extensions());
        self.readers.push(reader);
    }

    pub fn get_reader(&self, name: &str) -> Option<&dyn CaptureReader> {
        let result = self
            .readers
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.as_ref());

        if result.is_none() {
            warn!("Capture reader not found: {}", name);
        }

        result
    }

    pub fn get_reader_by_extension(&self, extension: &str) -> Option<&dyn CaptureReader> {
        let extension = extension.to_ascii_lowercase();
        let result = self
            .readers
            .iter()
            .find(|r| r.extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref());

        match result {
            Some(reader) => debug!("Selected reader '{}' for extension '.{}'", reader.name(), extension),
            None => warn!("No capture reader for extension '.{}'", extension),
        }

        result
    }

    /// Sniffs the first bytes of the stream to choose a reader.
    pub fn read_auto(&self, mut reader: Box<dyn Read>) -> Result<Vec<IncomingMessage>, ParseError> {
        let mut sample = Vec::with_capacity(SAMPLE_SIZE);
        (&mut reader).take(SAMPLE_SIZE as u64).read_to_end(&mut sample)?;
        debug!("Read {} byte sample for format detection", sample.len());

        let format = detect_format(&sample);
        info!("Capture format hint: {:?}", format);

        let selected = match format {
            FormatHint::Csv => self.get_reader("csv"),
            FormatHint::Ndjson => self.get_reader("ndjson"),
            FormatHint::Json => self.get_reader("json"),
            FormatHint::Unknown => self
                .readers
                .iter()
                .find(|r| {
                    let can_read = r.can_read(&sample);
                    debug!("Reader '{}' can_read: {}", r.name(), can_read);
                    can_read
                })
                .map(|r| r.as_ref()),
        };

        match selected {
            Some(selected) => {
                info!("Reading capture with '{}'", selected.name());
                selected.read(Box::new(Cursor::new(sample).chain(reader)))
            }
            None => {
                error!("Unable to detect capture format");
                Err(ParseError::UndetectableFormat)
            }
        }
    }

    /// Uses the file extension when it names a known format, otherwise
    /// falls back to [`ReaderRegistry::read_auto`].
    pub fn read_with_hint(
        &self,
        reader: Box<dyn Read>,
        filename: &str,
    ) -> Result<Vec<IncomingMessage>, ParseError> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        match self.get_reader_by_extension(extension) {
            Some(selected) => {
                info!("Using reader '{}' for file '{}'", selected.name(), filename);
                selected.read(reader)
            }
            None => {
                warn!("Falling back to auto-detection for '{}'", filename);
                self.read_auto(reader)
            }
        }
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

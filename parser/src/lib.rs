// Telemetry event parser for IoT Hub messages
// Message validation core plus capture readers with a registry

pub mod types;
pub mod message;
pub mod options;
pub mod event;
pub mod message_parser;
pub mod validate;

pub mod base_reader;
pub mod readers;
pub mod registry;

// Individual capture readers
pub mod csv_reader;
pub mod ndjson_reader;
pub mod json_reader;

// Re-export main types
pub use types::*;
pub use message::{AmqpValue, IncomingMessage, MessageBody, SystemProperties};
pub use options::{ParseOptions, PropertyGroup, PropertyGroups};
pub use event::{EventProperties, ParseOutcome, ParsedEvent};
pub use message_parser::MessageParser;
pub use validate::{validate_messages, MessageFilter, ValidationSummary};
pub use base_reader::{CaptureReader, FormatHint};
pub use registry::ReaderRegistry;

// Re-export readers
pub use csv_reader::CsvReader;
pub use ndjson_reader::NdjsonReader;
pub use json_reader::JsonReader;

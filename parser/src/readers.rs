//! Central list of capture readers.
//!
//! To support a new capture format, implement [`CaptureReader`] in its own
//! module, export it from `lib.rs` and add it to [`all_readers`].

use crate::base_reader::CaptureReader;
use crate::{CsvReader, JsonReader, NdjsonReader};
use tracing::info;

/// Boxes a list of readers into a `Vec<Box<dyn CaptureReader>>`.
///
/// ```rust,ignore
/// let readers = register_readers![NdjsonReader, CsvReader];
/// ```
#[macro_export]
macro_rules! register_readers {
    ($($reader:expr),* $(,)?) => {
        vec![
            $(Box::new($reader) as Box<dyn $crate::base_reader::CaptureReader>),*
        ]
    };
}

/// Every built-in reader, in auto-detection order.
pub fn all_readers() -> Vec<Box<dyn CaptureReader>> {
    info!("Initializing capture reader collection");

    register_readers![NdjsonReader, CsvReader, JsonReader]
}

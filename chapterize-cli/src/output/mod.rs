//! Output formatting module

use anyhow::Result;
use chapterize_core::CacheRecord;

/// Trait for discovery result formatters
pub trait ChapterFormatter {
    /// Format and output the result for one input file
    fn write_report(&mut self, source: &str, record: &CacheRecord) -> Result<()>;

    /// Finalize output (e.g., close the JSON array)
    fn finish(&mut self) -> Result<()>;
}

pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

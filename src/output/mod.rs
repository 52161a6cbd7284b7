pub mod report;
pub mod text_writer;

pub use report::{ConfigSnapshot, ExtractionReport, ExtractionSummary, FileEntry, ReportBuilder};
pub use text_writer::{sanitize_filename, TextOutputWriter};

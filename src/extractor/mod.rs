//! Format extractors and the registry that routes paths to them.
//!
//! Each format handler implements [`Extractor`]: a cheap, pure
//! [`can_handle`](Extractor::can_handle) predicate and an async
//! [`extract`](Extractor::extract) that turns a file into plain text.
//! The set is open: anything implementing the trait can be registered.

pub mod encoding;
pub mod fallback;
pub mod html;
pub mod office;
pub mod pdf;
pub mod registry;
pub mod spreadsheet;
pub mod text;

pub use encoding::{decode_text, DecodedText};
pub use fallback::FallbackExtractor;
pub use html::HtmlExtractor;
pub use office::{DocxExtractor, PptxExtractor};
pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use spreadsheet::SpreadsheetExtractor;
pub use text::PlainTextExtractor;

use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A pluggable handler that claims file paths and decodes them to text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short identifier used in results and logs.
    fn name(&self) -> &str;

    /// Whether this extractor claims `path`. Must be pure and fast; it is
    /// queried in isolation and may overlap with other extractors' claims.
    fn can_handle(&self, path: &Path) -> bool;

    /// Extracts the text of `path`, observing `cancel` at coarse checkpoints.
    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError>;
}

/// Case-insensitive extension match.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            extensions.contains(&ext.as_str())
        })
}

pub(crate) async fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::from_io(path, e))
}

/// Runs CPU-bound decoding off the async workers.
pub(crate) async fn run_blocking<F>(path: &Path, work: F) -> Result<String, ExtractError>
where
    F: FnOnce(PathBuf) -> Result<String, ExtractError> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || work(owned))
        .await
        .map_err(|e| ExtractError::decode(path, format!("decoder task failed: {}", e)))?
}

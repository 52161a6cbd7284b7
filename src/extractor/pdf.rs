use super::{has_extension, read_bytes, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::Path;

/// PDF text extraction backed by `pdf-extract`.
pub struct PdfExtractor {
    max_pages: usize,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self { max_pages: 0 }
    }

    /// Limits output to the first `max` pages (0 = all).
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;
        let data = read_bytes(path).await?;

        if !data.starts_with(b"%PDF") {
            return Err(ExtractError::decode(path, "invalid PDF file (missing %PDF header)"));
        }

        cancel.check()?;
        let max_pages = self.max_pages;
        let cancel = cancel.clone();

        super::run_blocking(path, move |path| {
            let pages = pdf_extract::extract_text_from_mem_by_pages(&data)
                .map_err(|e| ExtractError::decode(&path, format!("PDF extraction failed: {}", e)))?;

            let limit = if max_pages == 0 { pages.len() } else { max_pages };
            let mut text = String::new();

            for page in pages.iter().take(limit) {
                cancel.check()?;
                let page = page.trim();
                if page.is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(page);
            }

            if text.is_empty() {
                tracing::debug!(path = %path.display(), "PDF has no extractable text (may be scanned)");
            }

            Ok(text)
        })
        .await
    }
}

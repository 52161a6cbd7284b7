use super::{decode_text, has_extension, read_bytes, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "csv", "tsv", "log", "json", "xml", "yaml", "yml",
    "toml", "ini", "cfg", "conf", "tex",
];

/// Extractor for plain-text formats, decoded with [`decode_text`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, TEXT_EXTENSIONS)
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;
        let bytes = read_bytes(path).await?;
        cancel.check()?;

        let decoded = decode_text(&bytes);
        tracing::debug!(path = %path.display(), encoding = decoded.encoding, "decoded text file");
        Ok(decoded.text)
    }
}

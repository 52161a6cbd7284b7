use super::encoding::looks_binary;
use super::{decode_text, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Catch-all that reads small, non-binary files of any extension as text.
///
/// It claims every path, so it belongs at the front of the registry where
/// every specific extractor registered later overrides it. Files above
/// `max_bytes` or that look binary are declined as `Unsupported`.
#[derive(Debug, Clone, Copy)]
pub struct FallbackExtractor {
    max_bytes: u64,
}

impl FallbackExtractor {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes: max_bytes.max(1),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

#[async_trait]
impl Extractor for FallbackExtractor {
    fn name(&self) -> &str {
        "fallback"
    }

    fn can_handle(&self, _path: &Path) -> bool {
        true
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ExtractError::from_io(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| ExtractError::from_io(path, e))?
            .len();

        if size > self.max_bytes {
            tracing::debug!(
                path = %path.display(),
                size,
                max = self.max_bytes,
                "file too large for fallback extraction"
            );
            return Err(ExtractError::unsupported(path));
        }

        // Bounded read: the file may grow between metadata and read.
        let mut bytes = Vec::with_capacity(size as usize);
        file.take(self.max_bytes)
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| ExtractError::from_io(path, e))?;

        if looks_binary(&bytes) {
            return Err(ExtractError::unsupported(path));
        }

        cancel.check()?;
        Ok(decode_text(&bytes).text)
    }
}

//! Ordered, append-only collection of extractors.

use super::{
    DocxExtractor, Extractor, FallbackExtractor, HtmlExtractor, PdfExtractor, PlainTextExtractor,
    PptxExtractor, SpreadsheetExtractor,
};
use crate::cancel::CancellationSignal;
use crate::error::{ExtractError, Result};
use crate::pipeline::ExtractionOptions;
use std::path::Path;
use std::sync::Arc;

/// Resolves a path to the extractor that handles it.
///
/// Entries are never removed. Lookup scans from the most recently registered
/// entry back to the first, so a later registration overrides earlier ones
/// for every path it claims. Registration takes `&mut self`: finish it before
/// handing the registry to a [`BatchPipeline`](crate::pipeline::BatchPipeline).
#[derive(Default, Clone)]
pub struct ExtractorRegistry {
    entries: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in extractors, lowest priority first.
    pub fn with_defaults(options: &ExtractionOptions, enable_fallback: bool) -> Result<Self> {
        let mut registry = Self::new();

        if enable_fallback {
            registry.register(FallbackExtractor::new(options.fallback_max_bytes));
        }
        registry.register(PlainTextExtractor::new());
        registry.register(HtmlExtractor::new()?);
        registry.register(PdfExtractor::new());
        registry.register(DocxExtractor::new());
        registry.register(PptxExtractor::new());
        registry.register(SpreadsheetExtractor::new());

        Ok(registry)
    }

    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        self.register_shared(Arc::new(extractor));
    }

    /// Registers an extractor that may also be registered elsewhere.
    pub fn register_shared(&mut self, extractor: Arc<dyn Extractor>) {
        tracing::debug!(
            extractor = extractor.name(),
            position = self.entries.len(),
            "registered extractor"
        );
        self.entries.push(extractor);
    }

    pub fn resolve(&self, path: &Path) -> Option<Arc<dyn Extractor>> {
        self.entries
            .iter()
            .rev()
            .find(|extractor| extractor.can_handle(path))
            .cloned()
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.resolve(path).is_some()
    }

    /// Resolves and runs the extractor for a single file.
    pub async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> std::result::Result<String, ExtractError> {
        let extractor = self
            .resolve(path)
            .ok_or_else(|| ExtractError::unsupported(path))?;
        extractor.extract(path, cancel).await
    }

    /// Extractor names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("entries", &self.names())
            .finish()
    }
}

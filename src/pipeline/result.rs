use crate::error::{ErrorKind, ExtractError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of one attempted file. Created once by the pipeline, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    path: PathBuf,
    text: String,
    succeeded: bool,
    error_message: Option<String>,
    error_kind: Option<ErrorKind>,
    extractor: Option<String>,
}

impl ExtractionResult {
    pub fn success<P: Into<PathBuf>>(path: P, text: String, extractor: &str) -> Self {
        Self {
            path: path.into(),
            text,
            succeeded: true,
            error_message: None,
            error_kind: None,
            extractor: Some(extractor.to_string()),
        }
    }

    pub fn failure<P: Into<PathBuf>>(path: P, error: &ExtractError, extractor: Option<&str>) -> Self {
        Self {
            path: path.into(),
            text: String::new(),
            succeeded: false,
            error_message: Some(error.to_string()),
            error_kind: Some(error.kind()),
            extractor: extractor.map(str::to_string),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Name of the extractor that handled the file, if one was resolved.
    pub fn extractor(&self) -> Option<&str> {
        self.extractor.as_deref()
    }
}

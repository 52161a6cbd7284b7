use crate::config::Config;
use crate::error::{DocTextError, ErrorKind, ExtractError, Result};
use crate::pipeline::{ErrorPolicy, ExtractionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub root: Option<PathBuf>,
    pub extraction_time: DateTime<Utc>,
    pub summary: ExtractionSummary,
    /// Sorted by path, independent of completion order.
    pub files: Vec<FileEntry>,
    /// Problems outside per-file extraction, such as failed output writes.
    pub errors: Vec<String>,
    /// Set when the run ended early through fail-fast or cancellation.
    pub aborted: Option<String>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    pub total_characters: usize,
    pub extraction_duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub succeeded: bool,
    pub characters: usize,
    pub extractor: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub max_parallelism: usize,
    pub error_policy: ErrorPolicy,
    pub recursive: bool,
    pub max_depth: usize,
    pub enable_fallback: bool,
    pub preserve_structure: bool,
}

impl From<&Config> for ConfigSnapshot {
    fn from(config: &Config) -> Self {
        let options = config.extraction_options();
        Self {
            max_parallelism: options.max_parallelism,
            error_policy: options.error_policy,
            recursive: config.walk.recursive,
            max_depth: config.walk.max_depth,
            enable_fallback: config.extraction.enable_fallback,
            preserve_structure: config.output.preserve_structure,
        }
    }
}

impl From<&ExtractionResult> for FileEntry {
    fn from(result: &ExtractionResult) -> Self {
        Self {
            path: result.path().to_path_buf(),
            succeeded: result.succeeded(),
            characters: result.text().chars().count(),
            extractor: result.extractor().map(str::to_string),
            error_kind: result.error_kind(),
            error_message: result.error_message().map(str::to_string),
            output_path: None,
        }
    }
}

/// Accumulates streamed results into an [`ExtractionReport`].
pub struct ReportBuilder {
    root: Option<PathBuf>,
    config: ConfigSnapshot,
    started: Instant,
    entries: Vec<FileEntry>,
    errors: Vec<String>,
    aborted: Option<String>,
}

impl ReportBuilder {
    pub fn new(config: ConfigSnapshot) -> Self {
        Self {
            root: None,
            config,
            started: Instant::now(),
            entries: Vec::new(),
            errors: Vec::new(),
            aborted: None,
        }
    }

    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn record(&mut self, result: &ExtractionResult, output_path: Option<PathBuf>) {
        let mut entry = FileEntry::from(result);
        entry.output_path = output_path;
        self.entries.push(entry);
    }

    pub fn record_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn record_abort(&mut self, error: &ExtractError) {
        self.aborted = Some(error.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(mut self) -> ExtractionReport {
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));

        let mut summary = ExtractionSummary {
            total_files: self.entries.len(),
            extraction_duration: self.started.elapsed(),
            ..ExtractionSummary::default()
        };

        for entry in &self.entries {
            if entry.succeeded {
                summary.succeeded += 1;
                summary.total_characters += entry.characters;
            } else {
                summary.failed += 1;
                if let Some(kind) = entry.error_kind {
                    *summary.failures_by_kind.entry(kind).or_insert(0) += 1;
                }
            }
        }

        ExtractionReport {
            root: self.root,
            extraction_time: Utc::now(),
            summary,
            files: self.entries,
            errors: self.errors,
            aborted: self.aborted,
            config_used: self.config,
        }
    }
}

impl ExtractionReport {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json_content =
            serde_json::to_string_pretty(self).map_err(|e| DocTextError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json_content)?;

        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| DocTextError::Config {
            message: format!("Failed to parse report {}: {}", path.as_ref().display(), e),
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|entry| !entry.succeeded)
    }

    pub fn display_summary(&self) -> String {
        let mut out = String::new();
        let summary = &self.summary;

        let _ = writeln!(out, "Extraction Summary");
        let _ = writeln!(out, "==================");
        if let Some(ref root) = self.root {
            let _ = writeln!(out, "Root: {}", root.display());
        }
        let _ = writeln!(
            out,
            "Extracted at: {}",
            self.extraction_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "Duration: {:.2}s", summary.extraction_duration.as_secs_f64());
        let _ = writeln!(
            out,
            "Files: {} total, {} succeeded, {} failed",
            summary.total_files, summary.succeeded, summary.failed
        );
        let _ = writeln!(out, "Characters extracted: {}", summary.total_characters);

        if !summary.failures_by_kind.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Failures by kind:");
            for (kind, count) in &summary.failures_by_kind {
                let _ = writeln!(out, "  {}: {}", kind, count);
            }
        }

        if let Some(ref reason) = self.aborted {
            let _ = writeln!(out);
            let _ = writeln!(out, "Run ended early: {}", reason);
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Errors encountered:");
            for error in &self.errors {
                let _ = writeln!(out, "  - {}", error);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::from(&Config::default())
    }

    #[test]
    fn test_entries_sorted_by_path() {
        let mut builder = ReportBuilder::new(snapshot());
        builder.record(
            &ExtractionResult::success("/docs/b.txt", "bee".to_string(), "text"),
            None,
        );
        builder.record(
            &ExtractionResult::success("/docs/a.txt", "a".to_string(), "text"),
            None,
        );
        let report = builder.finish();

        let paths: Vec<&Path> = report.files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("/docs/a.txt"), Path::new("/docs/b.txt")]);
    }

    #[test]
    fn test_summary_counts() {
        let mut builder = ReportBuilder::new(snapshot()).with_root("/docs");
        builder.record(
            &ExtractionResult::success("/docs/a.txt", "héllo".to_string(), "text"),
            Some(PathBuf::from("/out/a.txt.txt")),
        );
        builder.record(
            &ExtractionResult::failure(
                "/docs/b.bin",
                &ExtractError::unsupported("/docs/b.bin"),
                None,
            ),
            None,
        );
        builder.record(
            &ExtractionResult::failure(
                "/docs/c.pdf",
                &ExtractError::decode("/docs/c.pdf", "bad xref"),
                Some("pdf"),
            ),
            None,
        );
        builder.record_abort(&ExtractError::Cancelled);
        let report = builder.finish();

        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.total_characters, 5);
        assert_eq!(report.summary.failures_by_kind[&ErrorKind::Unsupported], 1);
        assert_eq!(report.summary.failures_by_kind[&ErrorKind::DecodeFailure], 1);
        assert_eq!(report.failures().count(), 2);
        assert!(report.aborted.is_some());

        let text = report.display_summary();
        assert!(text.contains("3 total, 1 succeeded, 2 failed"));
        assert!(text.contains("unsupported: 1"));
        assert!(text.contains("Run ended early"));
    }

    #[test]
    fn test_save_and_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let mut builder = ReportBuilder::new(snapshot());
        builder.record(
            &ExtractionResult::failure(
                "/docs/missing.txt",
                &ExtractError::NotFound {
                    path: PathBuf::from("/docs/missing.txt"),
                },
                Some("text"),
            ),
            None,
        );
        let report = builder.finish();

        let path = temp_dir.path().join("meta").join("report.json");
        report.save_json(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"not_found\""));

        let loaded = ExtractionReport::load_json(&path).unwrap();
        assert_eq!(loaded.files, report.files);
        assert_eq!(loaded.config_used, report.config_used);
    }
}

pub mod cancel;
pub mod config;
pub mod error;
pub mod extractor;
pub mod output;
pub mod pipeline;
pub mod scanner;

// Public API re-exports
pub use cancel::CancellationSignal;
pub use config::{Config, ConfigOverrides, ExtractionConfig, OutputConfig, WalkConfig};
pub use error::{DocTextError, ErrorKind, ExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{Extractor, ExtractorRegistry};
pub use output::{ConfigSnapshot, ExtractionReport, ReportBuilder, TextOutputWriter};
pub use pipeline::{
    BatchPipeline, ErrorPolicy, ErrorSink, ExtractionOptions, ExtractionResult, ResultStream,
};
pub use scanner::{DirectoryWalker, Walk};

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the metadata directory written inside the output directory.
pub const METADATA_DIR: &str = ".doctext";

/// Main library interface: walk a tree, extract every file, persist the text.
pub struct DocText {
    config: Config,
    walker: DirectoryWalker,
    pipeline: BatchPipeline,
    cancel: CancellationSignal,
}

impl DocText {
    /// Create an instance with the built-in extractors.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let options = config.extraction_options();
        let registry =
            ExtractorRegistry::with_defaults(&options, config.extraction.enable_fallback)?;
        Ok(Self::assemble(config, registry))
    }

    /// Create an instance around a caller-built registry.
    pub fn with_registry(config: Config, registry: ExtractorRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, registry))
    }

    fn assemble(config: Config, registry: ExtractorRegistry) -> Self {
        let options = config.extraction_options();
        Self {
            walker: DirectoryWalker::from_config(&config.walk),
            pipeline: BatchPipeline::new(registry, options),
            cancel: CancellationSignal::new(),
            config,
        }
    }

    /// Route walk and extraction failures to `sink` instead of the log.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.walker = self.walker.with_error_sink(sink.clone());
        self.pipeline = self.pipeline.with_error_sink(sink);
        self
    }

    pub fn walk<P: AsRef<Path>>(&self, root: P) -> Result<Walk> {
        self.walker.walk(root)
    }

    /// Extract an explicit set of files.
    pub fn extract_files<I>(&self, paths: I) -> ResultStream
    where
        I: IntoIterator<Item = PathBuf>,
        I::IntoIter: Send + 'static,
    {
        self.pipeline.run(paths, self.cancel.clone())
    }

    /// Walk `root` and extract everything it yields.
    pub fn extract_directory<P: AsRef<Path>>(&self, root: P) -> Result<ResultStream> {
        let walk = self.walker.walk(root)?;
        Ok(self.run_walk(walk, None))
    }

    /// Walk `root`, write extracted text under the configured output
    /// directory and build a report of the run.
    ///
    /// Text files are written on tokio's blocking pool. An output directory
    /// equal to `root` or containing it is rejected with
    /// [`DocTextError::InvalidPath`] before anything is created or removed.
    pub async fn extract_directory_to_output<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Result<ExtractionReport> {
        self.cancel.check()?;

        let walk = self.walker.walk(root)?;
        let root = walk.root().to_path_buf();

        let writer = match self.config.output.directory {
            Some(ref directory) => {
                let writer = TextOutputWriter::new(scanner::absolute_path(directory))
                    .with_source_root(&root)
                    .with_preserve_structure(self.config.output.preserve_structure)
                    .with_force_overwrite(self.config.output.force_overwrite);
                writer.initialize()?;
                tracing::info!(path = %writer.output_dir().display(), "initialized output directory");
                Some(writer)
            }
            None => None,
        };

        let excluded = writer.as_ref().map(|w| w.output_dir().to_path_buf());
        let mut stream = self.run_walk(walk, excluded);
        let mut builder = ReportBuilder::new(ConfigSnapshot::from(&self.config)).with_root(&root);

        while let Some(item) = stream.next().await {
            match item {
                Ok(result) => {
                    let (result, written) = match writer {
                        Some(ref writer) => {
                            let writer = writer.clone();
                            let write = tokio::task::spawn_blocking(move || {
                                let written = writer.write(&result);
                                (result, written)
                            });
                            match write.await {
                                Ok((result, written)) => (result, Some(written)),
                                Err(e) => {
                                    builder.record_error(format!("Text writer task failed: {}", e));
                                    continue;
                                }
                            }
                        }
                        None => (result, None),
                    };
                    let output_path = match written {
                        Some(Ok(path)) => path,
                        Some(Err(e)) => {
                            tracing::warn!(
                                path = %result.path().display(),
                                error = %e,
                                "failed to write extracted text"
                            );
                            builder.record_error(format!(
                                "Failed to write text for {}: {}",
                                result.path().display(),
                                e
                            ));
                            None
                        }
                        None => None,
                    };
                    builder.record(&result, output_path);
                }
                Err(error) => builder.record_abort(&error),
            }
        }

        let report = builder.finish();

        if let (Some(ref writer), true) = (writer, self.config.output.write_report) {
            let report_path = writer
                .output_dir()
                .join(METADATA_DIR)
                .join("extraction_report.json");
            report.save_json(&report_path)?;
        }

        tracing::info!(
            total = report.summary.total_files,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            "directory extraction finished"
        );

        Ok(report)
    }

    fn run_walk(&self, walk: Walk, excluded: Option<PathBuf>) -> ResultStream {
        let registry = self.pipeline.registry().clone();
        let skip_unsupported = self.config.walk.skip_unsupported;

        let paths = walk.filter(move |path| {
            if excluded.as_ref().is_some_and(|dir| path.starts_with(dir)) {
                return false;
            }
            // A panicking claim is left for the pipeline to attribute to the file.
            !skip_unsupported
                || panic::catch_unwind(AssertUnwindSafe(|| registry.is_supported(path)))
                    .unwrap_or(true)
        });

        self.pipeline.run(paths, self.cancel.clone())
    }

    /// Signal shared by every run started from this instance.
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Stop admitting files; in-flight extractions finish first. Permanent
    /// for this instance.
    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel on Ctrl+C. Only one handler can be installed per process.
    pub fn install_signal_handler(&self) -> Result<()> {
        self.cancel.install_ctrlc_handler()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        self.pipeline.registry()
    }

    pub fn pipeline(&self) -> &BatchPipeline {
        &self.pipeline
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

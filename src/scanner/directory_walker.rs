use crate::config::WalkConfig;
use crate::error::{DocTextError, ExtractError, Result};
use crate::pipeline::sink::{ErrorSink, TracingErrorSink};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Enumerates plain files under a root directory.
///
/// Depth 0 is the files directly inside the root. With `recursive` set, a
/// subdirectory found at depth `d` is entered while `d < max_depth` and
/// contributes files at depth `d + 1`; otherwise only depth-0 files are
/// produced. No extension filtering happens here.
pub struct DirectoryWalker {
    recursive: bool,
    max_depth: usize,
    sink: Arc<dyn ErrorSink>,
}

impl DirectoryWalker {
    pub fn new(recursive: bool, max_depth: usize) -> Self {
        Self {
            recursive,
            max_depth,
            sink: Arc::new(TracingErrorSink),
        }
    }

    pub fn from_config(config: &WalkConfig) -> Self {
        Self::new(config.recursive, config.max_depth)
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts a lazy, depth-first walk: files before subdirectories at each
    /// level, siblings in the platform's enumeration order. A fresh call
    /// re-walks from scratch.
    pub fn walk<P: AsRef<Path>>(&self, root: P) -> Result<Walk> {
        let root_path = super::absolute_path(root.as_ref());

        if !root_path.exists() {
            return Err(DocTextError::InvalidPath {
                path: root_path.display().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(DocTextError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        // walkdir counts the root itself as depth 0, so our depth d is its d + 1.
        let walk_depth = if self.recursive {
            self.max_depth.saturating_add(1)
        } else {
            1
        };

        let entries = WalkDir::new(&root_path)
            .min_depth(1)
            .max_depth(walk_depth)
            .follow_links(false)
            .sort_by(|a, b| a.file_type().is_dir().cmp(&b.file_type().is_dir()))
            .into_iter();

        tracing::debug!(
            root = %root_path.display(),
            recursive = self.recursive,
            max_depth = self.max_depth,
            "starting directory walk"
        );

        Ok(Walk {
            root: root_path,
            entries,
            sink: self.sink.clone(),
        })
    }
}

impl Default for DirectoryWalker {
    fn default() -> Self {
        Self::from_config(&WalkConfig::default())
    }
}

/// Lazy sequence of absolute file paths produced by [`DirectoryWalker::walk`].
pub struct Walk {
    root: PathBuf,
    entries: walkdir::IntoIter,
    sink: Arc<dyn ErrorSink>,
}

impl Walk {
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn report(&self, err: walkdir::Error) {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let message = format!("Skipping unreadable directory entry: {}", err);
        let io_error = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message.clone()));
        let cause = ExtractError::from_io(&path, io_error);

        self.sink.on_error(&path, &cause, &message);
    }
}

impl Iterator for Walk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.entries.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        return Some(entry.into_path());
                    }
                }
                // The failed branch yields nothing more; siblings continue.
                Err(err) => self.report(err),
            }
        }
    }
}

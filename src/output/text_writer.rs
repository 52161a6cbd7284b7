use crate::error::{DocTextError, Result};
use crate::pipeline::ExtractionResult;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

const TEXT_SUFFIX: &str = ".txt";

/// Persists extracted text next to a mirror of the source tree.
#[derive(Debug, Clone)]
pub struct TextOutputWriter {
    output_dir: PathBuf,
    source_root: Option<PathBuf>,
    preserve_structure: bool,
    force_overwrite: bool,
}

impl TextOutputWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            source_root: None,
            preserve_structure: true,
            force_overwrite: false,
        }
    }

    /// Root the source paths are made relative to when preserving structure.
    pub fn with_source_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.source_root = Some(root.into());
        self
    }

    pub fn with_preserve_structure(mut self, preserve: bool) -> Self {
        self.preserve_structure = preserve;
        self
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory, replacing an existing one only when forced.
    ///
    /// An output directory that is the source root or one of its ancestors is
    /// refused before anything is removed.
    pub fn initialize(&self) -> Result<()> {
        if let Some(ref root) = self.source_root {
            if contains_path(&self.output_dir, root) {
                return Err(DocTextError::InvalidPath {
                    path: format!(
                        "Output directory {} contains the source root {}",
                        self.output_dir.display(),
                        root.display()
                    ),
                });
            }
        }

        if self.output_dir.exists() {
            if !self.force_overwrite {
                return Err(DocTextError::OutputDirectoryExists {
                    path: self.output_dir.display().to_string(),
                });
            }
            tracing::debug!(path = %self.output_dir.display(), "replacing existing output directory");
            fs::remove_dir_all(&self.output_dir)?;
        }

        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Where the text for `source` is written.
    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        let relative = match (&self.source_root, self.preserve_structure) {
            (Some(root), true) => source.strip_prefix(root).ok().map(Path::to_path_buf),
            _ => None,
        };

        let dest = match relative {
            Some(relative) => {
                let mut name: OsString = relative.into_os_string();
                name.push(TEXT_SUFFIX);
                self.output_dir.join(name)
            }
            None => {
                let file_name = source
                    .file_name()
                    .ok_or_else(|| DocTextError::InvalidPath {
                        path: source.display().to_string(),
                    })?
                    .to_string_lossy();
                self.output_dir
                    .join(format!("{}{}", sanitize_filename(&file_name), TEXT_SUFFIX))
            }
        };

        validate_destination_path(&dest)?;
        Ok(dest)
    }

    /// Writes a successful result; failed results are skipped with `Ok(None)`.
    pub fn write(&self, result: &ExtractionResult) -> Result<Option<PathBuf>> {
        if !result.succeeded() {
            return Ok(None);
        }

        let mut dest = self.destination_for(result.path())?;
        if !self.preserve_structure {
            dest = unique_destination(dest);
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, result.text())?;

        // Match the source's modification time
        if let Ok(modified) = fs::metadata(result.path()).and_then(|m| m.modified()) {
            let _ = filetime::set_file_mtime(&dest, filetime::FileTime::from_system_time(modified));
        }

        tracing::debug!(source = %result.path().display(), dest = %dest.display(), "wrote text");
        Ok(Some(dest))
    }
}

/// True when `dir` is `path` or one of its ancestors, lexically or after
/// resolving symlinks.
pub fn contains_path(dir: &Path, path: &Path) -> bool {
    if path.starts_with(dir) {
        return true;
    }
    match (fs::canonicalize(dir), fs::canonicalize(path)) {
        (Ok(dir), Ok(path)) => path.starts_with(dir),
        _ => false,
    }
}

/// Flat layouts can map two sources to one name; number the later ones.
fn unique_destination(dest: PathBuf) -> PathBuf {
    if !dest.exists() {
        return dest;
    }

    let stem = dest
        .file_name()
        .map(|n| n.to_string_lossy().trim_end_matches(TEXT_SUFFIX).to_string())
        .unwrap_or_default();

    (1..)
        .map(|n| dest.with_file_name(format!("{} ({}){}", stem, n, TEXT_SUFFIX)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(dest)
}

fn validate_destination_path(path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy();

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(DocTextError::InvalidPath {
            path: format!("Directory traversal not allowed: {}", path_str),
        });
    }

    check_path_length(path)?;

    if let Some(filename) = path.file_name().and_then(|s| s.to_str()) {
        #[cfg(windows)]
        {
            let reserved_names = [
                "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6",
                "COM7", "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7",
                "LPT8", "LPT9",
            ];

            let name_upper = filename.to_uppercase();
            let base_name = name_upper.split('.').next().unwrap_or_default();

            if reserved_names.contains(&base_name) {
                return Err(DocTextError::InvalidPath {
                    path: format!("Reserved filename on Windows: {}", filename),
                });
            }
        }

        let invalid_chars = ['<', '>', ':', '"', '|', '?', '*'];
        if filename
            .chars()
            .any(|c| invalid_chars.contains(&c) || c.is_control())
        {
            return Err(DocTextError::InvalidPath {
                path: format!("Filename contains invalid characters: {}", filename),
            });
        }
    }

    Ok(())
}

pub fn check_path_length(path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy();

    #[cfg(windows)]
    const MAX_PATH: usize = 260;

    #[cfg(not(windows))]
    const MAX_PATH: usize = 4096;

    if path_str.len() > MAX_PATH {
        Err(DocTextError::InvalidPath {
            path: format!(
                "Path too long: {} characters (max: {})",
                path_str.len(),
                MAX_PATH
            ),
        })
    } else {
        Ok(())
    }
}

pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_end_matches(&['.', ' '][..]).trim_start();

    if sanitized.is_empty() {
        "unnamed_file".to_string()
    } else {
        sanitized.to_string()
    }
}

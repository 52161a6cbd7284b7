pub mod directory_walker;

pub use directory_walker::{DirectoryWalker, Walk};

use std::path::{Path, PathBuf};

/// Makes `path` absolute against the working directory without touching the filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

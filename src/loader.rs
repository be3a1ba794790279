//! Loading a test file: read it from disk and scan it for test declarations.
//!
//! The file is never executed. Loading fails only when the file cannot be read as text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use m_syntax::ScannedFile;
use thiserror::Error;

/// The test file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot load such file -- {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{} is a directory, not a test file", path.display())]
    IsDirectory { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
}

/// Source of scanned test files.
pub trait TestFileLoader {
    fn load(&self, path: &Path) -> Result<ScannedFile, LoadError>;
}

/// Reads files from the filesystem and scans them (default behavior).
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceLoader;

impl TestFileLoader for SourceLoader {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<ScannedFile, LoadError> {
        let source = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::IsADirectory => LoadError::IsDirectory {
                path: path.to_path_buf(),
            },
            _ => LoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let scanned = m_syntax::scan(&source);
        tracing::debug!(tests = scanned.test_count(), "loaded test file");
        Ok(scanned)
    }
}

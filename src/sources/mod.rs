use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Applet;

/// Per-file progress: `(current file name, completed, total)`.
pub type ProgressFn<'a> = dyn FnMut(&str, usize, usize) + 'a;

pub trait Source {
    /// Fails only when the directory itself cannot be listed.
    fn scan(&self, progress: Option<&mut ProgressFn<'_>>) -> Result<Vec<Applet>, ScanError>;
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Regular files in `dir` whose extension is one of `extensions` (ignoring
/// case), in directory enumeration order.
pub(crate) fn list_candidates(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, ScanError> {
    let read_dir = fs::read_dir(dir).map_err(|source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

pub mod applets;
pub mod extensions;

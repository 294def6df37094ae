//! Server-side file store: a flat directory of named files.
//!
//! The store is a cheap cloneable handle passed into every session, so tests
//! can point it at an isolated temporary root. There is no in-memory catalog;
//! every `list` re-reads the directory, and the filesystem itself is the only
//! shared state between sessions (concurrent writes to the same name are an
//! unsynchronized race).

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The named file does not exist (or is a directory).
    #[error("file '{0}' does not exist on the server")]
    NotFound(String),

    /// The name contains path separators or parent-directory segments.
    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Handle to the flat directory the server exposes.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the root directory if it is absent.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).await?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the regular files under the root, in whatever order the
    /// directory enumeration yields. Subdirectories are skipped. Callers must
    /// treat the result as a set; the order is filesystem-dependent.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(names)
    }

    /// Open a stored file for reading. Fails with `NotFound` if the path is
    /// absent or a directory.
    pub async fn open_for_read(&self, name: &str) -> Result<File, StoreError> {
        let path = self.resolve(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(File::open(&path).await?),
            Ok(_) => Err(StoreError::NotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open (create or truncate) a stored file for writing.
    pub async fn open_for_write(&self, name: &str) -> Result<File, StoreError> {
        let path = self.resolve(name)?;
        Ok(File::create(&path).await?)
    }

    /// Join a client-supplied name onto the root. Names that could escape the
    /// flat namespace (separators, `..`, absolute paths, empty) are rejected
    /// rather than normalized.
    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(StoreError::InvalidName(name.to_string())),
        }
    }
}

//! Persisted "current version" marker.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::StorageError;

/// Default marker file, relative to the working directory.
pub const DEFAULT_MARKER_PATH: &str = ".migration-version";

/// Storage for the key of the last completed migration step.
pub trait MarkerStore: Send + Sync {
    /// The stored key, trimmed of surrounding whitespace. `None` when no
    /// marker exists or it is blank.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored key.
    fn write(&self, key: &str) -> Result<(), StorageError>;

    /// Remove the marker entirely.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Marker kept in a single text file.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileMarker {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PATH)
    }
}

impl MarkerStore for FileMarker {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(non_blank(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str) -> Result<(), StorageError> {
        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, key.as_bytes())?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Marker held in process memory.
#[derive(Debug, Default)]
pub struct MemoryMarker {
    key: Mutex<Option<String>>,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already recorded key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl MarkerStore for MemoryMarker {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.key.lock().as_deref().and_then(non_blank))
    }

    fn write(&self, key: &str) -> Result<(), StorageError> {
        *self.key.lock() = Some(key.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.key.lock() = None;
        Ok(())
    }
}

impl<S: MarkerStore + ?Sized> MarkerStore for &S {
    fn read(&self) -> Result<Option<String>, StorageError> {
        (**self).read()
    }

    fn write(&self, key: &str) -> Result<(), StorageError> {
        (**self).write(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

fn non_blank(content: &str) -> Option<String> {
    let trimmed = content.trim_matches(|c| matches!(c, '\n' | '\r' | '\t' | ' '));
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let marker = FileMarker::new(dir.path().join("version"));

        assert_eq!(marker.read().unwrap(), None);
        marker.clear().unwrap();
    }

    #[test]
    fn file_marker_round_trips_trimmed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version");
        std::fs::write(&path, "  0002_users\r\n").unwrap();
        let marker = FileMarker::new(&path);

        assert_eq!(marker.read().unwrap().as_deref(), Some("0002_users"));

        marker.write("0003_posts").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0003_posts");
        assert!(!path.with_extension("tmp").exists());

        marker.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn blank_marker_is_uninitialized() {
        let marker = MemoryMarker::with_key(" \n");
        assert_eq!(marker.read().unwrap(), None);
    }

    #[test]
    fn default_marker_path() {
        assert_eq!(FileMarker::default().path(), Path::new(".migration-version"));
    }
}

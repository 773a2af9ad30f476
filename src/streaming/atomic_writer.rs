//! Atomic blob writer with automatic cleanup on failure.
//!
//! Writes to a temporary file in the same directory as the destination,
//! then atomically replaces the destination on `finish()`. If dropped
//! before finishing, the temporary file is automatically cleaned up.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// An atomic writer for stored blobs.
///
/// Readers of `final_path` only ever observe the old or the new content,
/// never a partially written chunk batch.
pub struct AtomicBlobWriter {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
}

impl AtomicBlobWriter {
    /// Creates a new atomic writer targeting the specified path.
    ///
    /// The temporary file is created in the same directory as `final_path`
    /// so that the final rename stays on one filesystem.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the parent directory cannot be
    /// determined or the temporary file cannot be created.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let final_path = final_path.as_ref().to_path_buf();

        let parent_dir = final_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                AppError::Storage(format!(
                    "Cannot determine parent directory for: {}",
                    final_path.display()
                ))
            })?;

        let temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| AppError::Storage(format!("Failed to create temporary file: {}", e)))?;

        Ok(Self {
            writer: BufWriter::new(temp_file),
            final_path,
        })
    }

    /// Appends bytes to the pending blob.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| AppError::Storage(format!("Failed to write blob: {}", e)))
    }

    /// Flushes the buffer and atomically persists the file to the final path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if flushing or persisting fails.
    /// On error, the temporary file is cleaned up automatically.
    pub fn finish(self) -> Result<PathBuf, AppError> {
        let named_temp = self
            .writer
            .into_inner()
            .map_err(|e| AppError::Storage(format!("Failed to flush buffer: {}", e.error())))?;

        named_temp.persist(&self.final_path).map_err(|e| {
            AppError::Storage(format!(
                "Failed to persist blob to {}: {}",
                self.final_path.display(),
                e.error
            ))
        })?;

        Ok(self.final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_successful_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let final_path = temp_dir.path().join("batch.json");

        let mut writer = AtomicBlobWriter::new(&final_path).expect("Failed to create writer");
        writer.write_all(br#"{"fileContents":"#).unwrap();
        writer.write_all(b"[]}").unwrap();

        let result_path = writer.finish().expect("Failed to finish");
        assert_eq!(result_path, final_path);

        let content = fs::read_to_string(&final_path).expect("Failed to read file");
        assert_eq!(content, r#"{"fileContents":[]}"#);
    }

    #[test]
    fn test_drop_cleanup() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let final_path = temp_dir.path().join("batch.json");

        {
            let mut writer = AtomicBlobWriter::new(&final_path).expect("Failed to create writer");
            writer.write_all(b"partial").unwrap();
            // Dropped without finish()
        }

        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .expect("Failed to read dir")
            .collect();
        assert!(entries.is_empty(), "Temp file should be cleaned up on drop");
        assert!(!final_path.exists());
    }

    #[test]
    fn test_overwrite_behavior() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let final_path = temp_dir.path().join("batch.json");
        fs::write(&final_path, "OLD_CONTENT").unwrap();

        let mut writer = AtomicBlobWriter::new(&final_path).expect("Failed to create writer");
        writer.write_all(b"NEW_CONTENT").unwrap();
        writer.finish().expect("Failed to finish");

        assert_eq!(fs::read_to_string(&final_path).unwrap(), "NEW_CONTENT");
    }

    #[test]
    fn test_invalid_parent_directory() {
        #[cfg(unix)]
        {
            assert!(AtomicBlobWriter::new("/").is_err());
        }
        assert!(AtomicBlobWriter::new("bare-name.json").is_err());
    }
}

//! Local-filesystem blob store.
//!
//! Buckets are directories under a root; keys are relative paths inside the
//! bucket. Writes go through [`AtomicBlobWriter`] so a crashed run never
//! leaves a half-written output batch behind.

use std::path::{Component, Path, PathBuf};

use super::{BlobStore, StoreFuture};
use crate::error::AppError;
use crate::streaming::AtomicBlobWriter;

/// Blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps `bucket/key` to a path under the root.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if either part is empty or would escape
    /// its parent (absolute paths, `..`).
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, AppError> {
        let bucket = relative_segment(bucket, "bucket")?;
        let key = relative_segment(key, "key")?;
        Ok(self.root.join(bucket).join(key))
    }
}

/// Accepts only plain relative paths made of normal components.
fn relative_segment<'a>(value: &'a str, what: &str) -> Result<&'a Path, AppError> {
    let path = Path::new(value);
    let is_plain = path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)));

    if is_plain {
        Ok(path)
    } else {
        Err(AppError::Storage(format!("Invalid {}: {:?}", what, value)))
    }
}

impl BlobStore for FsBlobStore {
    fn get<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let path = self.object_path(bucket, key)?;
            tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    AppError::Storage(format!("No such object: {}/{}", bucket, key))
                }
                _ => AppError::Storage(format!("Failed to read {}/{}: {}", bucket, key, e)),
            })
        })
    }

    fn put<'a>(&'a self, bucket: &'a str, key: &'a str, body: Vec<u8>) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let path = self.object_path(bucket, key)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::Storage(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }

            // Run the blocking temp-file write in a separate thread
            tokio::task::spawn_blocking(move || {
                let mut writer = AtomicBlobWriter::new(&path)?;
                writer.write_all(&body)?;
                writer.finish().map(|_| ())
            })
            .await
            .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        })
    }
}

//! Blob storage seam for batch input and chunked output.
//!
//! The pipeline only needs get/put of whole objects addressed by bucket and
//! key. Hosts plug in their object-store client by implementing [`BlobStore`];
//! the crate ships an in-memory store and a local-filesystem store.

mod fs;
mod memory;

use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Boxed future returned by [`BlobStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// Opaque get/put blob service.
///
/// Implementations must be safe to call concurrently; the handler may have
/// several batches in flight at once.
pub trait BlobStore: Send + Sync {
    /// Fetches the full object stored at `bucket/key`.
    fn get<'a>(&'a self, bucket: &'a str, key: &'a str) -> StoreFuture<'a, Vec<u8>>;

    /// Stores `body` at `bucket/key`, replacing any existing object.
    fn put<'a>(&'a self, bucket: &'a str, key: &'a str, body: Vec<u8>) -> StoreFuture<'a, ()>;
}

pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod storage;
pub mod streaming;

pub use crate::config::Settings;
pub use crate::error::AppError;
pub use crate::manifest::{BatchContent, ContentRecord, InvocationEvent, OutputManifest};
pub use crate::pipeline::{ChunkingHandler, HandlerOptions};
pub use crate::storage::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use crate::streaming::{transform_record, ChunkSize};

//! Pipeline step that applies the row chunker to staged batches.

mod handler;
mod scheduler;

pub use handler::{output_key, ChunkingHandler, HandlerOptions};
pub use scheduler::{BatchPermit, BatchScheduler};

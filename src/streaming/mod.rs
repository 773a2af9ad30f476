//! Chunking of tabular content bodies.
//!
//! This module provides the fixed-row chunker that splits header-plus-rows
//! text into header-prefixed chunks, as well as atomic blob writing with
//! automatic cleanup on failure.

mod atomic_writer;
mod row_chunker;

pub use atomic_writer::AtomicBlobWriter;
pub use row_chunker::{
    chunk_content, chunk_rows, parse_tabular, reassemble, split_chunk, transform_record,
    ChunkSize, ChunkStats, Tabular, ROW_TERMINATOR,
};

//! Invocation handler for the chunking pipeline step.
//!
//! For every batch referenced by the input event the handler fetches the
//! batch blob, chunks each content record, stores the chunked batch under
//! the output prefix and reports the new key in the output manifest.
//!
//! Invocations are all-or-nothing: any failure aborts the run and no
//! manifest is returned. Configuration and manifest problems are detected
//! before the first storage call.

use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::{info, Instrument};
use uuid::Uuid;

use super::scheduler::BatchScheduler;
use crate::config::{DEFAULT_MAX_CONCURRENT_BATCHES, DEFAULT_OUTPUT_PREFIX};
use crate::error::AppError;
use crate::manifest::{
    BatchContent, ContentBatch, InputFile, InvocationEvent, OutputFile, OutputManifest,
};
use crate::storage::BlobStore;
use crate::streaming::{chunk_content, ChunkSize};

/// Per-handler options, fixed for every invocation it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOptions {
    pub rows_per_chunk: i64,
    pub output_prefix: String,
    pub max_concurrent_batches: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            rows_per_chunk: ChunkSize::DEFAULT.get() as i64,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }
}

/// Output key for a batch: the input key under the output namespace.
pub fn output_key(prefix: &str, input_key: &str) -> String {
    format!("{}{}", prefix, input_key)
}

pub struct ChunkingHandler {
    store: Arc<dyn BlobStore>,
    options: HandlerOptions,
    /// Shared by every invocation on this handler.
    scheduler: BatchScheduler,
}

impl ChunkingHandler {
    /// Creates a handler over `store`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `max_concurrent_batches` is 0.
    pub fn new(store: Arc<dyn BlobStore>, options: HandlerOptions) -> Result<Self, AppError> {
        let scheduler = BatchScheduler::new(options.max_concurrent_batches)?;
        Ok(Self {
            store,
            options,
            scheduler,
        })
    }

    /// Runs one invocation.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidChunkSize` - `rows_per_chunk` is not positive
    /// - `AppError::MissingField` - no bucket, no input files, or a batch without a key
    /// - `AppError::Storage` - a batch could not be read or written
    /// - `AppError::InvalidPayload` - a batch blob is not valid batch JSON
    /// - `AppError::EmptyInput` - a content body has no header line
    pub async fn handle(&self, event: &InvocationEvent) -> Result<OutputManifest, AppError> {
        let size = ChunkSize::new(self.options.rows_per_chunk)?;
        let bucket = event.require_bucket()?;
        let files = event.require_input_files()?;
        let keys = collect_batch_keys(files)?;

        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!("chunk_invocation", %invocation_id, bucket);

        self.run(bucket, files, &keys, size).instrument(span).await
    }

    async fn run(
        &self,
        bucket: &str,
        files: &[InputFile],
        keys: &[Vec<&str>],
        size: ChunkSize,
    ) -> Result<OutputManifest, AppError> {
        let batch_count: usize = keys.iter().map(Vec::len).sum();
        info!(
            files = files.len(),
            batches = batch_count,
            rows_per_chunk = size.get(),
            "Starting chunk invocation"
        );

        // Ordered buffering keeps outputs aligned with inputs; the first
        // error drops every batch still in flight.
        let produced: Vec<String> = stream::iter(keys.iter().flatten())
            .map(|key| self.process_batch(bucket, key, size))
            .buffered(self.scheduler.max_batches())
            .try_collect()
            .await?;

        let mut produced = produced.into_iter();
        let mut output_files = Vec::with_capacity(files.len());
        for (file, file_keys) in files.iter().zip(keys) {
            let content_batches = produced
                .by_ref()
                .take(file_keys.len())
                .map(ContentBatch::new)
                .collect();

            output_files.push(OutputFile {
                original_file_location: file.original_file_location.clone(),
                file_metadata: file.file_metadata.clone(),
                content_batches,
            });
        }

        info!(batches = batch_count, "Chunk invocation complete");

        Ok(OutputManifest { output_files })
    }

    /// Fetches, chunks and stores one batch. Returns the output key.
    async fn process_batch(
        &self,
        bucket: &str,
        key: &str,
        size: ChunkSize,
    ) -> Result<String, AppError> {
        let permit = self.scheduler.acquire().await?;

        let raw = self.store.get(bucket, key).await?;
        let content = BatchContent::from_slice(&raw)?;

        let span = tracing::Span::current();
        let (chunked, stats) =
            tokio::task::spawn_blocking(move || span.in_scope(|| chunk_content(&content, size)))
                .await
                .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

        let out_key = output_key(&self.options.output_prefix, key);
        self.store.put(bucket, &out_key, chunked.to_vec()?).await?;

        info!(
            key,
            output_key = %out_key,
            records = stats.records,
            rows = stats.total_rows,
            chunks = stats.chunk_count(),
            active_batches = permit.active_batches(),
            "Batch chunked"
        );

        Ok(out_key)
    }
}

/// Resolves every batch key up front so a malformed entry fails the
/// invocation before any storage access.
fn collect_batch_keys(files: &[InputFile]) -> Result<Vec<Vec<&str>>, AppError> {
    files
        .iter()
        .enumerate()
        .map(|(f, file)| {
            file.content_batches
                .iter()
                .enumerate()
                .map(|(b, batch)| {
                    batch
                        .key
                        .as_deref()
                        .filter(|key| !key.is_empty())
                        .ok_or_else(|| {
                            AppError::MissingField(format!(
                                "inputFiles[{}].contentBatches[{}].key",
                                f, b
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

//! Runtime settings.
//!
//! Loaded from built-in defaults, then an optional `chunker.toml` (or an
//! explicit file), then `CHUNKER_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::AppError;
use crate::pipeline::HandlerOptions;
use crate::streaming::ChunkSize;

/// Default namespace prepended to input keys to form output keys.
pub const DEFAULT_OUTPUT_PREFIX: &str = "Output/";

/// Default number of batches processed at once.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Maximum data rows per output chunk. Signed so that bad values reach
    /// validation instead of failing deserialization.
    pub rows_per_chunk: i64,
    pub output_prefix: String,
    /// Root directory of the filesystem blob store.
    pub storage_root: PathBuf,
    pub max_concurrent_batches: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows_per_chunk: ChunkSize::DEFAULT.get() as i64,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            storage_root: PathBuf::from("./data"),
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads and validates settings. See [`Settings::read`] for sources.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let settings = Self::read(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from defaults, an optional file and the environment
    /// without validating them, so callers can apply overrides first.
    ///
    /// With `path` unset, `chunker.toml` in the working directory is read if
    /// it exists. Environment variables use the `CHUNKER_` prefix, e.g.
    /// `CHUNKER_ROWS_PER_CHUNK=10`.
    pub fn read(path: Option<&Path>) -> Result<Self, AppError> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("rows_per_chunk", defaults.rows_per_chunk)?
            .set_default("output_prefix", defaults.output_prefix)?
            .set_default(
                "storage_root",
                defaults.storage_root.to_string_lossy().into_owned(),
            )?
            .set_default("max_concurrent_batches", defaults.max_concurrent_batches as u64)?
            .set_default("log_filter", defaults.log_filter)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("chunker").required(false)),
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("CHUNKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Validates settings invariants.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidChunkSize` if `rows_per_chunk` is not positive
    /// - `AppError::Config` for an empty output prefix or zero concurrency
    pub fn validate(&self) -> Result<(), AppError> {
        ChunkSize::new(self.rows_per_chunk)?;

        if self.output_prefix.is_empty() {
            return Err(AppError::Config(
                "output_prefix must not be empty".into(),
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(AppError::Config(
                "max_concurrent_batches must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Handler options derived from these settings.
    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            rows_per_chunk: self.rows_per_chunk,
            output_prefix: self.output_prefix.clone(),
            max_concurrent_batches: self.max_concurrent_batches,
        }
    }
}

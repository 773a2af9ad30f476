//! Wire types exchanged with the ingestion pipeline.
//!
//! Field names follow the pipeline's camelCase JSON exactly. Values the
//! transform does not interpret (`fileMetadata`, `originalFileLocation`,
//! `contentMetadata`) are carried through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Invocation Event
// ─────────────────────────────────────────────────────────────────────────────

/// Input event handed to the transform by the pipeline runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    /// Bucket holding every batch referenced by `input_files`.
    pub bucket_name: Option<String>,
    /// Files staged by the previous pipeline step.
    pub input_files: Option<Vec<InputFile>>,
}

impl InvocationEvent {
    /// Returns the bucket name, or `MissingField` if absent or blank.
    pub fn require_bucket(&self) -> Result<&str, AppError> {
        match self.bucket_name.as_deref() {
            Some(bucket) if !bucket.trim().is_empty() => Ok(bucket),
            _ => Err(AppError::MissingField("bucketName".into())),
        }
    }

    /// Returns the input files, or `MissingField` if absent or empty.
    pub fn require_input_files(&self) -> Result<&[InputFile], AppError> {
        match self.input_files.as_deref() {
            Some(files) if !files.is_empty() => Ok(files),
            _ => Err(AppError::MissingField("inputFiles".into())),
        }
    }
}

/// One staged source document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFile {
    #[serde(default)]
    pub content_batches: Vec<ContentBatch>,
    #[serde(default = "empty_object")]
    pub file_metadata: serde_json::Value,
    #[serde(default = "empty_object")]
    pub original_file_location: serde_json::Value,
}

/// Reference to one stored batch blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ContentBatch {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output Manifest
// ─────────────────────────────────────────────────────────────────────────────

/// Result returned to the pipeline runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputManifest {
    pub output_files: Vec<OutputFile>,
}

/// Output entry for one input file; batches are parallel to the input's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub original_file_location: serde_json::Value,
    pub file_metadata: serde_json::Value,
    pub content_batches: Vec<ContentBatch>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch Content
// ─────────────────────────────────────────────────────────────────────────────

/// Decoded body of a batch blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchContent {
    #[serde(default)]
    pub file_contents: Vec<ContentRecord>,
}

impl BatchContent {
    /// Decodes a batch blob as fetched from storage.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AppError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encodes the batch for storage.
    pub fn to_vec(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A typed unit of content. Type and metadata are opaque to the transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub content_body: String,
}

impl ContentRecord {
    /// Returns a record with this record's type and metadata and a new body.
    pub fn with_body(&self, body: String) -> Self {
        Self {
            content_type: self.content_type.clone(),
            content_metadata: self.content_metadata.clone(),
            content_body: body,
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

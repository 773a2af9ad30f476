use serde::Serialize;
use thiserror::Error;

/// Patterns (lowercase) that indicate credentials leaking through a storage error.
/// Used by `contains_sensitive()` for case-insensitive matching.
pub(crate) const SENSITIVE_PATTERNS: &[&str] = &[
    "x-amz-signature",
    "x-amz-security-token",
    "aws_secret_access_key",
    "secret_access_key",
    "session_token",
    "authorization:",
];

/// Returns true if the message contains any sensitive pattern (case-insensitive).
fn contains_sensitive(msg: &str) -> bool {
    let lower = msg.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Sanitizes a message for the invoking runtime.
/// If sensitive content is detected, returns the fallback instead.
fn sanitize_message(msg: &str, fallback: &str) -> String {
    if contains_sensitive(msg) {
        fallback.into()
    } else {
        msg.to_string()
    }
}

/// Error presentation handed back to the pipeline runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Chunking ──────────────────────────────────────────────────────────────
    #[error("Content body has no header line")]
    EmptyInput,

    #[error("Invalid rows per chunk: {0} (must be at least 1)")]
    InvalidChunkSize(i64),

    // ── Manifest ──────────────────────────────────────────────────────────────
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ── Storage ───────────────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a presentation for the invoking runtime.
    /// Never leaks signed URLs or storage credentials.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── Chunking ──────────────────────────────────────────────────────
            AppError::EmptyInput => ErrorPresentation {
                title: "Empty Content".into(),
                message: "A content body has no header line, so it cannot be chunked.".into(),
                action: Some("Check the upstream extraction step".into()),
            },

            AppError::InvalidChunkSize(size) => ErrorPresentation {
                title: "Invalid Chunk Size".into(),
                message: format!("Rows per chunk must be at least 1, got {}.", size),
                action: Some("Fix the rows_per_chunk setting".into()),
            },

            // ── Manifest ──────────────────────────────────────────────────────
            AppError::MissingField(field) => ErrorPresentation {
                title: "Malformed Manifest".into(),
                message: format!("The input manifest is missing '{}'.", field),
                action: Some("Fix the invocation payload and retry".into()),
            },

            AppError::InvalidPayload(msg) => ErrorPresentation {
                title: "Invalid Payload".into(),
                message: format!("Could not decode content: {}", msg),
                action: Some("Check the staged batch format".into()),
            },

            // ── Storage ───────────────────────────────────────────────────────
            AppError::Storage(msg) => ErrorPresentation {
                title: "Storage Error".into(),
                message: sanitize_message(msg, "Reading or writing a blob failed."),
                action: Some("Check bucket access and retry".into()),
            },

            // ── Configuration ─────────────────────────────────────────────────
            AppError::Config(msg) => ErrorPresentation {
                title: "Invalid Configuration".into(),
                message: msg.clone(),
                action: Some("Fix the configuration and restart".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong while chunking.".into(),
                action: None,
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidPayload(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

// Lets the runtime wrapper return AppError directly as JSON
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}

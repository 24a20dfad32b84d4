//! Error types for the tipsheet library.
//!
//! Each pipeline stage has its own error enum so callers can tell exactly
//! where an ingestion failed:
//!
//! * [`ExtractionError`] — turning bytes into text failed.
//! * [`AnalysisError`] — the remote model call failed.
//! * [`ParseError`] — the model answered, but not with what we asked for.
//!
//! [`IngestError`] is what the orchestrator returns. It wraps the stage
//! errors unchanged and adds the few failures that belong to the
//! orchestration itself.
//!
//! The sanitizer has no error type: it degrades unsafe input instead of
//! rejecting it. No message in this module ever includes the API key.

use crate::pipeline::input::UploadStatus;
use thiserror::Error;

/// Failure to turn an upload into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The declared filename has an extension we do not handle.
    #[error("Unsupported file type '{filename}'. Supported extensions: {supported}")]
    UnsupportedFormat { filename: String, supported: String },

    /// The upload never arrived intact; carries the platform status.
    #[error("Upload failed: {}", .status.message())]
    UploadTransport { status: UploadStatus },

    /// The bytes could not be read.
    #[error("Unable to read file '{filename}': {detail}")]
    UnreadableFile { filename: String, detail: String },

    /// The PDF produced too little text to be worth analysing.
    #[error(
        "Could not extract text from PDF '{filename}' ({chars} characters recovered). \
The file may be protected or contain only images."
    )]
    LowYield { filename: String, chars: usize },
}

/// Failure of the outbound analysis call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No usable API key was configured; nothing was sent.
    #[error("Analysis API key is not configured.\nSet ANTHROPIC_API_KEY (or CLAUDE_API_KEY).")]
    NotConfigured,

    /// Connection, TLS, or timeout failure before a status was received.
    #[error("Network error calling analysis API: {detail}")]
    Network { detail: String },

    /// The provider answered with a non-success status.
    #[error("Analysis API error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Success status, but the envelope did not contain generated text.
    #[error("Malformed analysis API response: {detail}")]
    MalformedResponse { detail: String },
}

/// The model text could not be turned into an analysis result.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Not valid JSON. `raw` is the model text exactly as received.
    #[error("Model response is not valid JSON: {detail}")]
    InvalidJson { raw: String, detail: String },

    /// Valid JSON, but a required top-level field is missing or mistyped.
    #[error("Model response is missing or has an invalid '{field}' field")]
    SchemaViolation { field: String },
}

impl ParseError {
    /// Raw model text when the failure was a JSON syntax error.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            ParseError::InvalidJson { raw, .. } => Some(raw),
            ParseError::SchemaViolation { .. } => None,
        }
    }
}

/// Fatal errors returned by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Nothing to analyse: no pasted text and no usable file content.
    #[error("Content is required (paste text or upload a file)")]
    EmptyContent,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The storage collaborator rejected the record.
    #[error("Failed to store record: {0}")]
    Storage(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

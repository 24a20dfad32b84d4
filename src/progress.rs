//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to be told when
//! each stage starts, finishes, or fails. The CLI uses it to drive a spinner;
//! a web handler could forward the same events over a socket.
//!
//! # Example
//!
//! ```rust
//! use tipsheet::{IngestConfig, IngestProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl IngestProgressCallback for Log {
//!     fn on_stage_complete(&self, stage: Stage, output_len: usize) {
//!         eprintln!("{stage} done ({output_len} bytes)");
//!     }
//! }
//!
//! let config = IngestConfig::builder()
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Analyze,
    Parse,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Analyze => "analyze",
            Stage::Parse => "parse",
            Stage::Store => "store",
        })
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// Implementations must be `Send + Sync`: one config (and so one callback)
/// is shared by every ingestion running in the process. All methods default
/// to no-ops.
pub trait IngestProgressCallback: Send + Sync {
    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage succeeds.
    ///
    /// # Arguments
    /// * `output_len` — byte length of what the stage produced (extracted
    ///   text, raw model text, ...); zero for `Parse` and `Store`
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage fails. The error is also returned to the caller.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;

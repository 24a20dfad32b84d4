//! # tipsheet
//!
//! Turn a pasted article, a prompt, or an uploaded document into a draft
//! knowledge-base entry: plain text in, a titled, summarised, categorised
//! record with sanitized HTML fragments out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Submission (pasted text | .md/.txt/.pdf upload)
//!  │
//!  ├─ 1. Extract   decode text files, pull text out of PDFs (spawn_blocking)
//!  ├─ 2. Analyze   one Messages API call with a content-type instruction
//!  ├─ 3. Parse     strip fences, validate JSON, filter categories
//!  ├─ 4. Render    model fields → allowlisted HTML → sanitizer
//!  └─ 5. Store     optional hand-off to a RecordStore (status: draft)
//! ```
//!
//! Every HTML string the crate produces is a [`SafeHtml`], and the only way
//! to get one is through the sanitizer. Templates may print it unescaped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tipsheet::{ingest, ContentType, IngestConfig, Submission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key from ANTHROPIC_API_KEY / CLAUDE_API_KEY
//!     let config = IngestConfig::from_env()?;
//!     let submission = Submission::text(ContentType::Article, "Rust 2024 edition ships ...")
//!         .with_source_url("https://blog.rust-lang.org/");
//!     let record = ingest(submission, config).await?;
//!     println!("{}", record.title);
//!     println!("{}", record.result.summary().html);
//!     Ok(())
//! }
//! ```
//!
//! The sanitizer is usable on its own:
//!
//! ```rust
//! let safe = tipsheet::sanitize(r#"<p onclick="x()">Hi<script>bad()</script></p>"#);
//! assert_eq!(safe.as_str(), "<p>Hi</p>");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tipsheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! tipsheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sanitize;
pub mod vocabulary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::{AnalysisError, ExtractionError, IngestError, ParseError};
pub use ingest::{ingest, ingest_into, ingest_sync, FileInput, Pipeline, RecordStore, Submission};
pub use output::{
    AnalysisResult, ArticleAnalysis, ArticleResult, IngestRecord, IngestStats, PromptAnalysis,
    PromptResult, RecordStatus, Rendered,
};
pub use pipeline::extract::{ExtractedText, TextExtractor};
pub use pipeline::input::{supported_extensions, UploadStatus, UploadedFile};
pub use pipeline::llm::{AnalysisClient, RawModelText};
pub use pipeline::parse::ResponseParser;
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use sanitize::{sanitize, HtmlSanitizer, SafeHtml};
pub use vocabulary::{CategoryVocabulary, ContentType};

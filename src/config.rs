//! Configuration for the ingestion pipeline.
//!
//! Everything the pipeline needs to know lives in one [`IngestConfig`]:
//! the analysis endpoint, the PDF extraction knobs, the sanitizer's upload
//! prefix, and the category vocabulary. It is built once at startup, wrapped
//! in an `Arc`, and shared read-only by every stage and every concurrent
//! ingestion. Nothing mutates it afterwards, so nothing needs to lock it.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest, the same way [`IngestConfig::from_env`]
//! only overrides what the environment provides.

use crate::error::IngestError;
use crate::progress::ProgressCallback;
use crate::vocabulary::CategoryVocabulary;
use std::fmt;
use std::path::PathBuf;

/// Default Messages API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value the request format targets.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Value shipped in sample config files; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Process-wide, read-only pipeline configuration.
///
/// Built via [`IngestConfig::builder()`], [`IngestConfig::from_env()`], or
/// [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use tipsheet::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .api_key("sk-ant-...")
///     .max_tokens(2048)
///     .pdftotext(None::<String>)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 2048);
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Messages endpoint. Default: [`DEFAULT_API_URL`].
    pub api_url: String,

    /// Secret sent in the `x-api-key` header. Never logged or displayed.
    pub api_key: String,

    /// Sent in the `anthropic-version` header. Default: `2023-06-01`.
    pub api_version: String,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Upper bound on generated tokens. Default: 4096.
    ///
    /// A full article analysis with five main points and a multi-paragraph
    /// summary fits comfortably; a response cut short by this limit will
    /// usually fail JSON parsing, and the client logs a warning when the
    /// provider reports it.
    pub max_tokens: u32,

    /// Timeout for the whole analysis request, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Layout-preserving PDF text utility. Default: `Some("pdftotext")`.
    ///
    /// `None` disables the subprocess strategy and goes straight to stream
    /// scraping.
    pub pdftotext: Option<PathBuf>,

    /// How long the PDF utility may run, in seconds. Default: 30.
    pub pdftotext_timeout_secs: u64,

    /// PDF text must be strictly longer than this (in characters). Default: 50.
    pub min_pdf_chars: usize,

    /// Path prefix of locally served uploads, kept by the image rule of the
    /// sanitizer. Default: `/uploads/`.
    pub upload_path_prefix: String,

    /// Category slugs per content type.
    pub vocabulary: CategoryVocabulary,

    /// Stage events for progress display. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            api_timeout_secs: 120,
            pdftotext: Some(PathBuf::from("pdftotext")),
            pdftotext_timeout_secs: 30,
            min_pdf_chars: 50,
            upload_path_prefix: crate::sanitize::DEFAULT_UPLOAD_PREFIX.to_string(),
            vocabulary: CategoryVocabulary::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pdftotext", &self.pdftotext)
            .field("pdftotext_timeout_secs", &self.pdftotext_timeout_secs)
            .field("min_pdf_chars", &self.min_pdf_chars)
            .field("upload_path_prefix", &self.upload_path_prefix)
            .field("vocabulary", &self.vocabulary)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overridden by the environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `ANTHROPIC_API_KEY`, else `CLAUDE_API_KEY` | `api_key` |
    /// | `TIPSHEET_API_URL` | `api_url` |
    /// | `TIPSHEET_MODEL` | `model` |
    /// | `TIPSHEET_PDFTOTEXT` (`off` disables) | `pdftotext` |
    /// | `TIPSHEET_UPLOAD_PREFIX` | `upload_path_prefix` |
    pub fn from_env() -> Result<Self, IngestError> {
        Self::builder_from_env().build()
    }

    /// Like [`from_env`](Self::from_env) but returns the builder so callers
    /// (the CLI) can layer flags on top before validation.
    pub fn builder_from_env() -> IngestConfigBuilder {
        let mut builder = Self::builder();

        let key = non_empty_env("ANTHROPIC_API_KEY").or_else(|| non_empty_env("CLAUDE_API_KEY"));
        if let Some(key) = key {
            builder = builder.api_key(key);
        }
        if let Some(url) = non_empty_env("TIPSHEET_API_URL") {
            builder = builder.api_url(url);
        }
        if let Some(model) = non_empty_env("TIPSHEET_MODEL") {
            builder = builder.model(model);
        }
        if let Some(tool) = non_empty_env("TIPSHEET_PDFTOTEXT") {
            builder = if tool.eq_ignore_ascii_case("off") {
                builder.pdftotext(None::<PathBuf>)
            } else {
                builder.pdftotext(Some(tool))
            };
        }
        if let Some(prefix) = non_empty_env("TIPSHEET_UPLOAD_PREFIX") {
            builder = builder.upload_path_prefix(prefix);
        }
        builder
    }

    /// True when a real (non-placeholder) API key is set.
    pub fn has_api_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pdftotext<P: Into<PathBuf>>(mut self, program: Option<P>) -> Self {
        self.config.pdftotext = program.map(Into::into);
        self
    }

    pub fn pdftotext_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdftotext_timeout_secs = secs.max(1);
        self
    }

    pub fn min_pdf_chars(mut self, n: usize) -> Self {
        self.config.min_pdf_chars = n;
        self
    }

    pub fn upload_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.upload_path_prefix = prefix.into();
        self
    }

    pub fn vocabulary(mut self, vocabulary: CategoryVocabulary) -> Self {
        self.config.vocabulary = vocabulary;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The API key is not required here: extraction and sanitizing work
    /// without one. [`crate::pipeline::llm::AnalysisClient::new`] checks it.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(IngestError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(IngestError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !(c.api_url.starts_with("http://") || c.api_url.starts_with("https://")) {
            return Err(IngestError::InvalidConfig(format!(
                "api_url must be an http(s) URL, got '{}'",
                c.api_url
            )));
        }
        if !c.upload_path_prefix.starts_with('/') || !c.upload_path_prefix.ends_with('/') {
            return Err(IngestError::InvalidConfig(format!(
                "upload_path_prefix must start and end with '/', got '{}'",
                c.upload_path_prefix
            )));
        }
        Ok(self.config)
    }
}

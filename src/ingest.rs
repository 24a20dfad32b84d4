//! Ingestion entry points: extract → analyze → parse → (store).
//!
//! A [`Pipeline`] owns one of each stage, built once from an
//! `Arc<IngestConfig>`, and runs any number of ingestions concurrently. It
//! keeps no per-request state. Each run either returns a complete
//! [`IngestRecord`] or the first stage error, unchanged; nothing is retried.
//!
//! Extraction blocks (file reads, the PDF subprocess), so it runs on tokio's
//! blocking pool. Dropping the returned future cancels the analysis call;
//! an extraction already running finishes on its own thread.

use crate::config::IngestConfig;
use crate::error::{AnalysisError, IngestError, ParseError};
use crate::output::{AnalysisResult, IngestRecord, IngestStats, RecordStatus};
use crate::pipeline::extract::{ExtractedText, TextExtractor};
use crate::pipeline::input::{UploadStatus, UploadedFile};
use crate::pipeline::llm::{AnalysisClient, RawModelText};
use crate::pipeline::parse::ResponseParser;
use crate::progress::Stage;
use crate::vocabulary::ContentType;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Prefix of the source recorded for file imports without a URL.
pub const FILE_SOURCE_PREFIX: &str = "File: ";

/// A file to extract, however it reached us.
#[derive(Debug, Clone)]
pub enum FileInput {
    /// A web upload with its transport status.
    Upload(UploadedFile),
    /// Bytes already in memory.
    Bytes { filename: String, bytes: Vec<u8> },
    /// A file on disk, named `filename` for dispatch purposes.
    Path { path: PathBuf, filename: String },
}

impl FileInput {
    /// The declared filename.
    pub fn filename(&self) -> &str {
        match self {
            FileInput::Upload(u) => &u.filename,
            FileInput::Bytes { filename, .. } | FileInput::Path { filename, .. } => filename,
        }
    }

    /// A form that was submitted without choosing a file.
    fn is_absent(&self) -> bool {
        match self {
            FileInput::Upload(u) => u.status == UploadStatus::NoFile || u.filename.is_empty(),
            _ => false,
        }
    }
}

/// One import request: pasted text, a file, or both.
///
/// When a file is present its extracted text replaces the pasted text.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub content_type: ContentType,
    pub source_url: Option<String>,
    pub pasted: String,
    pub file: Option<FileInput>,
}

impl Submission {
    pub fn text(content_type: ContentType, text: impl Into<String>) -> Self {
        Self {
            content_type,
            pasted: text.into(),
            ..Default::default()
        }
    }

    pub fn file(content_type: ContentType, file: FileInput) -> Self {
        Self {
            content_type,
            file: Some(file),
            ..Default::default()
        }
    }

    pub fn upload(content_type: ContentType, upload: UploadedFile) -> Self {
        Self::file(content_type, FileInput::Upload(upload))
    }

    pub fn bytes(content_type: ContentType, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::file(
            content_type,
            FileInput::Bytes {
                filename: filename.into(),
                bytes,
            },
        )
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_file(mut self, file: FileInput) -> Self {
        self.file = Some(file);
        self
    }
}

/// The storage collaborator that receives finished records.
///
/// Called on the ingesting task; implementations backed by blocking I/O
/// should be quick or hand off internally.
pub trait RecordStore {
    /// Identifier of the stored record.
    type Id;
    type Error: fmt::Display;

    fn store(&self, record: &IngestRecord) -> Result<Self::Id, Self::Error>;
}

/// The ingestion pipeline.
pub struct Pipeline {
    config: Arc<IngestConfig>,
    extractor: Arc<TextExtractor>,
    /// `None` when no API key is configured; analysis then fails with
    /// [`AnalysisError::NotConfigured`] after the content checks.
    client: Option<AnalysisClient>,
    parser: ResponseParser,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("extractor", &self.extractor)
            .field("analysis_configured", &self.client.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(config: impl Into<Arc<IngestConfig>>) -> Result<Self, IngestError> {
        let config = config.into();
        let client = match AnalysisClient::new(Arc::clone(&config)) {
            Ok(client) => Some(client),
            Err(AnalysisError::NotConfigured) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            extractor: Arc::new(TextExtractor::new(&config)),
            parser: ResponseParser::new(Arc::clone(&config)),
            client,
            config,
        })
    }

    /// Replace the extraction stage, e.g. with a custom PDF strategy chain.
    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Extract a file on the blocking pool.
    pub async fn extract(&self, file: FileInput) -> Result<ExtractedText, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let result = tokio::task::spawn_blocking(move || match file {
            FileInput::Upload(upload) => extractor.extract_upload(&upload),
            FileInput::Bytes { filename, bytes } => extractor.extract(&bytes, &filename),
            FileInput::Path { path, filename } => extractor.extract_file(&path, &filename),
        })
        .await
        .map_err(|e| IngestError::Internal(format!("Extraction task panicked: {}", e)))?;
        Ok(result?)
    }

    /// Run the remote analysis call.
    pub async fn analyze(
        &self,
        text: &str,
        source_url: Option<&str>,
        content_type: ContentType,
    ) -> Result<RawModelText, AnalysisError> {
        let client = self.client.as_ref().ok_or(AnalysisError::NotConfigured)?;
        client.analyze(text, source_url, content_type).await
    }

    /// Parse and sanitize raw model text.
    pub fn parse(&self, raw: &str, content_type: ContentType) -> Result<AnalysisResult, ParseError> {
        self.parser.parse(raw, content_type)
    }

    /// Run one submission through extract → analyze → parse.
    ///
    /// # Errors
    /// The first failing stage's error, unchanged, or
    /// [`IngestError::EmptyContent`] when there is nothing to analyse.
    pub async fn ingest(&self, submission: Submission) -> Result<IngestRecord, IngestError> {
        let total_start = Instant::now();
        let Submission {
            content_type,
            source_url,
            pasted,
            file,
        } = submission;

        let mut source_url = source_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let mut stats = IngestStats::default();

        // ── Step 1: Extract ──────────────────────────────────────────────
        let content = match file.filter(|f| !f.is_absent()) {
            Some(file) => {
                let filename = file.filename().to_string();
                let extract_start = Instant::now();
                self.notify_start(Stage::Extract);
                let text = self.track(Stage::Extract, self.extract(file).await, |t| t.as_str().len())?;
                stats.extract_ms = extract_start.elapsed().as_millis() as u64;
                if source_url.is_none() {
                    source_url = Some(format!("{FILE_SOURCE_PREFIX}{filename}"));
                }
                text.into_string()
            }
            None => pasted.trim().to_string(),
        };

        if content.is_empty() {
            warn!("Rejected submission with no content");
            return Err(IngestError::EmptyContent);
        }
        stats.content_chars = content.chars().count();

        // ── Step 2: Analyze ──────────────────────────────────────────────
        let analyze_start = Instant::now();
        self.notify_start(Stage::Analyze);
        let analyzed = self
            .analyze(&content, source_url.as_deref(), content_type)
            .await;
        let raw = self.track(Stage::Analyze, analyzed, |r| r.as_str().len())?;
        stats.analyze_ms = analyze_start.elapsed().as_millis() as u64;
        stats.response_chars = raw.as_str().chars().count();

        // ── Step 3: Parse ────────────────────────────────────────────────
        self.notify_start(Stage::Parse);
        let parsed = self.parse(raw.as_str(), content_type);
        let result = self.track(Stage::Parse, parsed, |_| 0)?;

        stats.total_ms = total_start.elapsed().as_millis() as u64;
        info!(
            "Ingested {} '{}' in {}ms",
            content_type,
            result.title(),
            stats.total_ms
        );

        Ok(IngestRecord {
            content_type,
            title: result.title().to_string(),
            source_url,
            source_content: content,
            category_slugs: result.suggested_categories().to_vec(),
            result,
            status: RecordStatus::Draft,
            stats,
        })
    }

    /// [`ingest`](Self::ingest), then hand the record to `store`.
    pub async fn ingest_into<S: RecordStore>(
        &self,
        store: &S,
        submission: Submission,
    ) -> Result<(S::Id, IngestRecord), IngestError> {
        let record = self.ingest(submission).await?;
        self.notify_start(Stage::Store);
        let stored = store
            .store(&record)
            .map_err(|e| IngestError::Storage(e.to_string()));
        let id = self.track(Stage::Store, stored, |_| 0)?;
        Ok((id, record))
    }

    fn notify_start(&self, stage: Stage) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    /// Report a stage outcome to the progress callback and pass it through.
    fn track<T, E: fmt::Display>(
        &self,
        stage: Stage,
        result: Result<T, E>,
        output_len: impl FnOnce(&T) -> usize,
    ) -> Result<T, E> {
        if let Some(ref cb) = self.config.progress_callback {
            match &result {
                Ok(value) => cb.on_stage_complete(stage, output_len(value)),
                Err(e) => cb.on_stage_error(stage, &e.to_string()),
            }
        }
        result
    }
}

/// Ingest one submission with a fresh [`Pipeline`].
///
/// Long-running services should build one `Pipeline` and reuse it; this is
/// for one-shot callers.
pub async fn ingest(
    submission: Submission,
    config: impl Into<Arc<IngestConfig>>,
) -> Result<IngestRecord, IngestError> {
    Pipeline::new(config)?.ingest(submission).await
}

/// [`ingest`], then store the record.
pub async fn ingest_into<S: RecordStore>(
    store: &S,
    submission: Submission,
    config: impl Into<Arc<IngestConfig>>,
) -> Result<(S::Id, IngestRecord), IngestError> {
    Pipeline::new(config)?.ingest_into(store, submission).await
}

/// Synchronous wrapper around [`ingest`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn ingest_sync(
    submission: Submission,
    config: impl Into<Arc<IngestConfig>>,
) -> Result<IngestRecord, IngestError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| IngestError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ingest(submission, config))
}

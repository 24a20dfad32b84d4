//! Text extraction: bytes plus a declared filename in, trimmed UTF-8 out.
//!
//! Dispatch is by extension only. Text and Markdown files go through the
//! decode path; PDFs go through the strategy chain in [`crate::pipeline::pdf`]
//! and must clear the yield threshold. Anything else is rejected before the
//! bytes are looked at.
//!
//! Everything here blocks (file reads, the PDF subprocess). Async callers
//! should go through [`crate::ingest`], which moves it onto the blocking pool.

use crate::config::IngestConfig;
use crate::error::ExtractionError;
use crate::pipeline::input::{unsupported, SourceFormat, UploadedFile};
use crate::pipeline::pdf::{PdfSource, PdfTextStrategy, PdftotextStrategy, StreamScrapeStrategy};
use encoding_rs::WINDOWS_1252;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Normalised text produced by a successful extraction.
///
/// Always valid UTF-8 with no leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
}

impl ExtractedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl AsRef<str> for ExtractedText {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Source encodings recognised by the decode path, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

/// Pick the first candidate encoding that accepts every byte.
///
/// ISO-8859-1 assigns C1 controls to 0x80–0x9F, which never appear in real
/// text, so a byte in that range means Windows-1252 punctuation.
pub fn detect_encoding(bytes: &[u8]) -> SourceEncoding {
    if std::str::from_utf8(bytes).is_ok() {
        SourceEncoding::Utf8
    } else if !bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        SourceEncoding::Latin1
    } else {
        SourceEncoding::Windows1252
    }
}

/// Decode a text file to UTF-8 and trim it.
pub fn decode_text(bytes: &[u8]) -> String {
    let encoding = detect_encoding(bytes);
    let decoded = match encoding {
        SourceEncoding::Utf8 => {
            let s = String::from_utf8_lossy(bytes);
            s.strip_prefix('\u{FEFF}').unwrap_or(&*s).to_string()
        }
        // encoding_rs follows WHATWG and folds ISO-8859-1 into Windows-1252,
        // so the strict Latin-1 mapping is done by hand.
        SourceEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect::<String>(),
        SourceEncoding::Windows1252 => WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    };
    if encoding != SourceEncoding::Utf8 {
        debug!("Transcoded {} bytes from {:?}", bytes.len(), encoding);
    }
    decoded.trim().to_string()
}

/// Turns uploaded bytes into plain text.
///
/// Built once from the configuration and reused across requests; it holds
/// no per-request state.
pub struct TextExtractor {
    pdf_strategies: Vec<Box<dyn PdfTextStrategy>>,
    min_pdf_chars: usize,
}

impl fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextExtractor")
            .field(
                "pdf_strategies",
                &self.pdf_strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("min_pdf_chars", &self.min_pdf_chars)
            .finish()
    }
}

impl TextExtractor {
    /// The standard chain: `pdftotext` when configured, then stream scraping.
    pub fn new(config: &IngestConfig) -> Self {
        let mut pdf_strategies: Vec<Box<dyn PdfTextStrategy>> = Vec::new();
        if let Some(program) = &config.pdftotext {
            pdf_strategies.push(Box::new(PdftotextStrategy::new(
                program.clone(),
                Duration::from_secs(config.pdftotext_timeout_secs),
            )));
        }
        pdf_strategies.push(Box::new(StreamScrapeStrategy));
        Self::with_strategies(pdf_strategies, config.min_pdf_chars)
    }

    /// A custom strategy chain, tried in the given order.
    pub fn with_strategies(
        pdf_strategies: Vec<Box<dyn PdfTextStrategy>>,
        min_pdf_chars: usize,
    ) -> Self {
        Self {
            pdf_strategies,
            min_pdf_chars,
        }
    }

    /// Extract text from in-memory bytes.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedText, ExtractionError> {
        let format = SourceFormat::from_filename(filename).ok_or_else(|| unsupported(filename))?;
        self.extract_as(format, PdfSource::from_bytes(bytes), filename)
    }

    /// Extract text from a file on disk. `filename` is the declared name,
    /// which may differ from the on-disk name of a temp upload.
    pub fn extract_file(&self, path: &Path, filename: &str) -> Result<ExtractedText, ExtractionError> {
        let format = SourceFormat::from_filename(filename).ok_or_else(|| unsupported(filename))?;
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::UnreadableFile {
            filename: filename.to_string(),
            detail: e.to_string(),
        })?;
        self.extract_as(format, PdfSource::with_path(&bytes, path), filename)
    }

    /// Extract text from a web upload, honouring its transport status.
    pub fn extract_upload(&self, upload: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
        if !upload.status.is_ok() {
            return Err(ExtractionError::UploadTransport {
                status: upload.status,
            });
        }
        self.extract_file(&upload.path, &upload.filename)
    }

    fn extract_as(
        &self,
        format: SourceFormat,
        source: PdfSource<'_>,
        filename: &str,
    ) -> Result<ExtractedText, ExtractionError> {
        if format.is_text() {
            let text = decode_text(source.bytes);
            info!("Decoded '{}': {} chars", filename, text.chars().count());
            return Ok(ExtractedText { text });
        }
        self.extract_pdf(source, filename)
    }

    /// First strategy whose output clears the threshold wins.
    fn extract_pdf(
        &self,
        source: PdfSource<'_>,
        filename: &str,
    ) -> Result<ExtractedText, ExtractionError> {
        let mut best = 0usize;
        for strategy in &self.pdf_strategies {
            let Some(text) = strategy.extract(&source) else {
                debug!("'{}': {} produced no text", filename, strategy.name());
                continue;
            };
            let chars = text.chars().count();
            if chars > self.min_pdf_chars {
                info!("Extracted '{}' via {}: {} chars", filename, strategy.name(), chars);
                return Ok(ExtractedText { text });
            }
            debug!(
                "'{}': {} yielded only {} chars (need more than {})",
                filename,
                strategy.name(),
                chars,
                self.min_pdf_chars
            );
            best = best.max(chars);
        }
        Err(ExtractionError::LowYield {
            filename: filename.to_string(),
            chars: best,
        })
    }
}

//! Input classification: what kind of file is this, and did it arrive?
//!
//! Uploads reach the pipeline with a declared filename, a temporary path,
//! and the transport status the web layer recorded. Nothing here reads the
//! bytes; this module only decides whether extraction should be attempted
//! and with which reader.

use crate::error::ExtractionError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions accepted for upload, lowercase, in display order.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["md", "txt", "pdf"];

/// How the bytes of a file are turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    PlainText,
    Markdown,
    Pdf,
}

impl SourceFormat {
    /// Classify by the final extension, case-insensitively.
    ///
    /// `report.final.PDF` is a PDF; `notes` (no extension) is unsupported.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(SourceFormat::PlainText),
            "md" => Some(SourceFormat::Markdown),
            "pdf" => Some(SourceFormat::Pdf),
            _ => None,
        }
    }

    /// Both text formats are decoded the same way.
    pub fn is_text(&self) -> bool {
        matches!(self, SourceFormat::PlainText | SourceFormat::Markdown)
    }
}

/// Accepted extensions, for help text and the file-picker `accept` list.
pub fn supported_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True when `filename` has an extension the extractor handles.
pub fn is_supported(filename: &str) -> bool {
    SourceFormat::from_filename(filename).is_some()
}

pub(crate) fn unsupported(filename: &str) -> ExtractionError {
    ExtractionError::UnsupportedFormat {
        filename: filename.to_string(),
        supported: SUPPORTED_EXTENSIONS.join(", "),
    }
}

/// Transport status recorded by the web layer for one uploaded file.
///
/// The numeric codes are the ones PHP-style form handlers report; other
/// front-ends map their own failures onto the closest variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Ok,
    /// Larger than the server-wide upload limit.
    IniSize,
    /// Larger than the form's declared limit.
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    /// A server extension stopped the upload.
    Extension,
    Unknown(u16),
}

impl UploadStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => UploadStatus::Ok,
            1 => UploadStatus::IniSize,
            2 => UploadStatus::FormSize,
            3 => UploadStatus::Partial,
            4 => UploadStatus::NoFile,
            6 => UploadStatus::NoTmpDir,
            7 => UploadStatus::CantWrite,
            8 => UploadStatus::Extension,
            other => UploadStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            UploadStatus::Ok => 0,
            UploadStatus::IniSize => 1,
            UploadStatus::FormSize => 2,
            UploadStatus::Partial => 3,
            UploadStatus::NoFile => 4,
            UploadStatus::NoTmpDir => 6,
            UploadStatus::CantWrite => 7,
            UploadStatus::Extension => 8,
            UploadStatus::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, UploadStatus::Ok)
    }

    /// Human-readable explanation shown to the uploader.
    pub fn message(&self) -> String {
        match self {
            UploadStatus::Ok => "The file was uploaded successfully".to_string(),
            UploadStatus::IniSize => {
                "The file exceeds the maximum upload size allowed by the server".to_string()
            }
            UploadStatus::FormSize => {
                "The file exceeds the maximum size allowed by the form".to_string()
            }
            UploadStatus::Partial => "The file was only partially uploaded".to_string(),
            UploadStatus::NoFile => "No file was uploaded".to_string(),
            UploadStatus::NoTmpDir => "Missing temporary folder on the server".to_string(),
            UploadStatus::CantWrite => "Failed to write the file to disk".to_string(),
            UploadStatus::Extension => "A server extension stopped the upload".to_string(),
            UploadStatus::Unknown(code) => format!("Unknown upload error (code {code})"),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// One file as handed over by the web layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name declared by the client. Only its extension is trusted.
    pub filename: String,
    /// Where the server stored the bytes.
    pub path: PathBuf,
    pub status: UploadStatus,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, status: UploadStatus) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
            status,
        }
    }

    /// An upload that arrived intact.
    pub fn ok(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(filename, path, UploadStatus::Ok)
    }
}

//! Output types produced by the pipeline.
//!
//! Every HTML-bearing field is a [`Rendered`] pair: the raw value the model
//! returned, plus the [`SafeHtml`] rendering of it. Templates render `html`
//! unescaped; `raw` is there for re-rendering, editing, and tests.
//!
//! Output types implement `Serialize` but not `Deserialize`: a `SafeHtml`
//! may only come out of the sanitizer, never out of a JSON blob.

use crate::sanitize::SafeHtml;
use crate::vocabulary::ContentType;
use serde::{Deserialize, Serialize};

/// A raw value and its sanitized HTML rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered<T> {
    pub raw: T,
    pub html: SafeHtml,
}

/// Structured detail of an article analysis.
///
/// Every field defaults to empty when the model leaves it out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleAnalysis {
    pub topic_type: String,
    pub difficulty_level: String,
    pub technologies_mentioned: Vec<String>,
    pub key_takeaways: Vec<String>,
    pub practical_applications: Vec<String>,
}

/// Structured detail of a prompt analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptAnalysis {
    pub prompt_type: String,
    pub complexity: String,
    pub variables: Vec<String>,
    pub best_practices: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleResult {
    /// Plain text.
    pub title: String,
    pub summary: Rendered<String>,
    pub main_points: Rendered<Vec<String>>,
    pub analysis: Rendered<ArticleAnalysis>,
    /// In-vocabulary slugs only, in the order the model gave them.
    pub suggested_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptResult {
    pub title: String,
    pub summary: Rendered<String>,
    /// Use cases.
    pub main_points: Rendered<Vec<String>>,
    /// The cleaned-up prompt with `[placeholders]`; `html` is a
    /// `<pre class="prompt-content">` block.
    pub formatted_prompt: Rendered<String>,
    pub analysis: Rendered<PromptAnalysis>,
    pub suggested_categories: Vec<String>,
}

/// A validated analysis, tagged by content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisResult {
    Article(ArticleResult),
    Prompt(PromptResult),
}

impl AnalysisResult {
    pub fn content_type(&self) -> ContentType {
        match self {
            AnalysisResult::Article(_) => ContentType::Article,
            AnalysisResult::Prompt(_) => ContentType::Prompt,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            AnalysisResult::Article(a) => &a.title,
            AnalysisResult::Prompt(p) => &p.title,
        }
    }

    pub fn summary(&self) -> &Rendered<String> {
        match self {
            AnalysisResult::Article(a) => &a.summary,
            AnalysisResult::Prompt(p) => &p.summary,
        }
    }

    pub fn main_points(&self) -> &Rendered<Vec<String>> {
        match self {
            AnalysisResult::Article(a) => &a.main_points,
            AnalysisResult::Prompt(p) => &p.main_points,
        }
    }

    pub fn analysis_html(&self) -> &SafeHtml {
        match self {
            AnalysisResult::Article(a) => &a.analysis.html,
            AnalysisResult::Prompt(p) => &p.analysis.html,
        }
    }

    pub fn formatted_prompt(&self) -> Option<&Rendered<String>> {
        match self {
            AnalysisResult::Article(_) => None,
            AnalysisResult::Prompt(p) => Some(&p.formatted_prompt),
        }
    }

    pub fn suggested_categories(&self) -> &[String] {
        match self {
            AnalysisResult::Article(a) => &a.suggested_categories,
            AnalysisResult::Prompt(p) => &p.suggested_categories,
        }
    }
}

/// Publication state of a stored record. Imports always start as drafts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Draft,
    Published,
}

/// Timing and size figures for one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Characters of content sent for analysis.
    pub content_chars: usize,
    /// Characters of raw model text received.
    pub response_chars: usize,
    pub extract_ms: u64,
    pub analyze_ms: u64,
    pub total_ms: u64,
}

/// What the pipeline hands to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRecord {
    pub content_type: ContentType,
    pub title: String,
    /// Caller-supplied URL, or `File: <name>` for file imports.
    pub source_url: Option<String>,
    /// The plain text that was analysed.
    pub source_content: String,
    pub result: AnalysisResult,
    /// Copy of the result's suggested categories, for the storage layer's
    /// category links.
    pub category_slugs: Vec<String>,
    pub status: RecordStatus,
    pub stats: IngestStats,
}

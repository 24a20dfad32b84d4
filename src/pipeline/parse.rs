//! Response parsing: raw model text in, validated [`AnalysisResult`] out.
//!
//! The parser is strict about the top-level shape and lenient about nested
//! detail. A missing `summary` fails the whole response; a missing
//! `technologies_mentioned` is just an empty list. Nested values of the
//! wrong type are coerced where that is unambiguous (a number becomes its
//! decimal text, a lone string becomes a one-item list) and otherwise
//! dropped.
//!
//! Every HTML fragment attached to the result has been through
//! [`HtmlSanitizer`]; the raw values sit next to it.

use crate::config::IngestConfig;
use crate::error::ParseError;
use crate::output::{
    AnalysisResult, ArticleAnalysis, ArticleResult, PromptAnalysis, PromptResult, Rendered,
};
use crate::pipeline::postprocess::clean_model_text;
use crate::pipeline::render::{
    render_article_analysis, render_formatted_prompt, render_main_points, render_prompt_analysis,
};
use crate::sanitize::HtmlSanitizer;
use crate::vocabulary::ContentType;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Title used when the model returns an empty one.
pub const UNTITLED: &str = "Untitled";

/// Field reported when the payload is valid JSON but not an object.
pub const ROOT_FIELD: &str = "root";

/// Validates model output against the schema for its content type.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    config: Arc<IngestConfig>,
    sanitizer: HtmlSanitizer,
}

impl ResponseParser {
    pub fn new(config: Arc<IngestConfig>) -> Self {
        let sanitizer = HtmlSanitizer::new(config.upload_path_prefix.clone());
        Self { config, sanitizer }
    }

    /// Parse raw model text for `content_type`.
    ///
    /// # Errors
    /// * [`ParseError::InvalidJson`] carrying `raw` untouched when the cleaned
    ///   text is not JSON
    /// * [`ParseError::SchemaViolation`] naming the first required top-level
    ///   field that is missing or has the wrong type
    pub fn parse(&self, raw: &str, content_type: ContentType) -> Result<AnalysisResult, ParseError> {
        let cleaned = clean_model_text(raw);
        let value: Value = serde_json::from_str(&cleaned).map_err(|e| ParseError::InvalidJson {
            detail: e.to_string(),
            raw: raw.to_string(),
        })?;
        let obj = value.as_object().ok_or_else(|| violation(ROOT_FIELD))?;

        let title = required_str(obj, "title")?;
        let summary = required_str(obj, "summary")?;
        let main_points = required(obj, "main_points", Value::as_array)?;
        let formatted_prompt = match content_type {
            ContentType::Prompt => Some(required_str(obj, "formatted_prompt")?),
            ContentType::Article => None,
        };
        let analysis = required(obj, "analysis", Value::as_object)?;
        let suggested = required(obj, "suggested_categories", Value::as_array)?;

        let title = match title.trim() {
            "" => UNTITLED.to_string(),
            t => t.to_string(),
        };
        let summary = Rendered {
            raw: summary.to_string(),
            html: self.sanitizer.sanitize(summary),
        };
        let points = lenient_list(main_points);
        let main_points = Rendered {
            html: self.sanitizer.sanitize(&render_main_points(&points)),
            raw: points,
        };
        let suggested_categories = self.filter_categories(content_type, suggested);

        let result = match content_type {
            ContentType::Article => {
                let detail = ArticleAnalysis {
                    topic_type: lenient_text(analysis.get("topic_type")),
                    difficulty_level: lenient_text(analysis.get("difficulty_level")),
                    technologies_mentioned: lenient_list_field(analysis, "technologies_mentioned"),
                    key_takeaways: lenient_list_field(analysis, "key_takeaways"),
                    practical_applications: lenient_list_field(analysis, "practical_applications"),
                };
                AnalysisResult::Article(ArticleResult {
                    title,
                    summary,
                    main_points,
                    analysis: Rendered {
                        html: self.sanitizer.sanitize(&render_article_analysis(&detail)),
                        raw: detail,
                    },
                    suggested_categories,
                })
            }
            ContentType::Prompt => {
                let detail = PromptAnalysis {
                    prompt_type: lenient_text(analysis.get("prompt_type")),
                    complexity: lenient_text(analysis.get("complexity")),
                    variables: lenient_list_field(analysis, "variables"),
                    best_practices: lenient_list_field(analysis, "best_practices"),
                    suggestions: lenient_list_field(analysis, "suggestions"),
                };
                let prompt = formatted_prompt.unwrap_or_default().to_string();
                AnalysisResult::Prompt(PromptResult {
                    title,
                    summary,
                    main_points,
                    formatted_prompt: Rendered {
                        html: self.sanitizer.sanitize(&render_formatted_prompt(&prompt)),
                        raw: prompt,
                    },
                    analysis: Rendered {
                        html: self.sanitizer.sanitize(&render_prompt_analysis(&detail)),
                        raw: detail,
                    },
                    suggested_categories,
                })
            }
        };

        info!(
            "Parsed {} analysis: '{}' ({} main points, {} categories)",
            content_type,
            result.title(),
            result.main_points().raw.len(),
            result.suggested_categories().len()
        );
        Ok(result)
    }

    /// Keep in-vocabulary slugs; anything else the model invented is dropped.
    fn filter_categories(&self, content_type: ContentType, suggested: &[Value]) -> Vec<String> {
        let slugs: Vec<&str> = suggested.iter().filter_map(Value::as_str).collect();
        let kept = self.config.vocabulary.filter(content_type, slugs.iter().copied());
        if kept.len() != suggested.len() {
            debug!(
                "Dropped {} suggested categories outside the {} vocabulary",
                suggested.len() - kept.len(),
                content_type
            );
        }
        kept
    }
}

fn violation(field: &str) -> ParseError {
    ParseError::SchemaViolation {
        field: field.to_string(),
    }
}

fn required<'a, T: ?Sized>(
    obj: &'a Map<String, Value>,
    field: &str,
    cast: impl Fn(&'a Value) -> Option<&'a T>,
) -> Result<&'a T, ParseError> {
    obj.get(field).and_then(cast).ok_or_else(|| violation(field))
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, ParseError> {
    required(obj, field, Value::as_str)
}

/// A scalar as text; anything else is empty.
fn lenient_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Scalars of an array as text, skipping blanks and nested structures.
fn lenient_list(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|v| lenient_text(Some(v)))
        .filter(|s| !s.is_empty())
        .collect()
}

fn lenient_list_field(obj: &Map<String, Value>, field: &str) -> Vec<String> {
    match obj.get(field) {
        Some(Value::Array(values)) => lenient_list(values),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

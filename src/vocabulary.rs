//! Content types and their fixed category vocabularies.
//!
//! The vocabularies are embedded in the instruction sent to the model and
//! used again to filter what the model suggests, so both sides always agree
//! on the same closed set of slugs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category slugs offered for articles, in prompt order.
pub const ARTICLE_CATEGORIES: [&str; 8] = [
    "llm-modeles-langage",
    "agents-ia",
    "vision-multimodal",
    "rag-embeddings",
    "fine-tuning-entrainement",
    "ethique-securite-ia",
    "outils-frameworks",
    "actualites-ia",
];

/// Category slugs offered for prompts, in prompt order.
pub const PROMPT_CATEGORIES: [&str; 8] = [
    "prompt-developpement",
    "prompt-redaction",
    "prompt-analyse",
    "prompt-creativite",
    "prompt-productivite",
    "prompt-education",
    "prompt-business",
    "prompt-systeme",
];

/// What kind of content is being ingested.
///
/// Selects the instruction template, the response schema, and the category
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Article,
    Prompt,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Prompt => "prompt",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "article" => Ok(ContentType::Article),
            "prompt" => Ok(ContentType::Prompt),
            other => Err(format!(
                "unknown content type '{other}' (expected 'article' or 'prompt')"
            )),
        }
    }
}

/// The closed set of category slugs per [`ContentType`].
///
/// Built once at startup (normally via `Default`) and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    article: Vec<String>,
    prompt: Vec<String>,
}

impl Default for CategoryVocabulary {
    fn default() -> Self {
        Self {
            article: ARTICLE_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            prompt: PROMPT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CategoryVocabulary {
    /// Custom vocabularies, for deployments whose category table differs.
    pub fn new(
        article: impl IntoIterator<Item = impl Into<String>>,
        prompt: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            article: article.into_iter().map(Into::into).collect(),
            prompt: prompt.into_iter().map(Into::into).collect(),
        }
    }

    pub fn slugs(&self, content_type: ContentType) -> &[String] {
        match content_type {
            ContentType::Article => &self.article,
            ContentType::Prompt => &self.prompt,
        }
    }

    pub fn contains(&self, content_type: ContentType, slug: &str) -> bool {
        self.slugs(content_type).iter().any(|s| s == slug)
    }

    /// Comma-separated list, as embedded in the instruction text.
    pub fn joined(&self, content_type: ContentType) -> String {
        self.slugs(content_type).join(", ")
    }

    /// Keep only in-vocabulary slugs, in the given order, without duplicates.
    pub fn filter<'a, I>(&self, content_type: ContentType, suggested: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for slug in suggested {
            let slug = slug.trim();
            if self.contains(content_type, slug) && !kept.iter().any(|k| k == slug) {
                kept.push(slug.to_string());
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_eight_slugs_each() {
        let v = CategoryVocabulary::default();
        assert_eq!(v.slugs(ContentType::Article).len(), 8);
        assert_eq!(v.slugs(ContentType::Prompt).len(), 8);
    }

    #[test]
    fn vocabularies_are_disjoint() {
        let v = CategoryVocabulary::default();
        for slug in v.slugs(ContentType::Article) {
            assert!(!v.contains(ContentType::Prompt, slug));
        }
    }

    #[test]
    fn filter_drops_unknown_and_duplicates_keeping_order() {
        let v = CategoryVocabulary::default();
        let kept = v.filter(
            ContentType::Article,
            ["outils-frameworks", "made-up", "agents-ia", "outils-frameworks", "prompt-analyse"],
        );
        assert_eq!(kept, vec!["outils-frameworks", "agents-ia"]);
    }

    #[test]
    fn joined_matches_prompt_order() {
        let v = CategoryVocabulary::default();
        assert!(v
            .joined(ContentType::Prompt)
            .starts_with("prompt-developpement, prompt-redaction"));
    }

    #[test]
    fn content_type_parses_case_insensitively() {
        assert_eq!("Prompt".parse::<ContentType>(), Ok(ContentType::Prompt));
        assert_eq!(" article ".parse::<ContentType>(), Ok(ContentType::Article));
        assert!("video".parse::<ContentType>().is_err());
    }

    #[test]
    fn content_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ContentType::Prompt).unwrap(), "\"prompt\"");
    }
}

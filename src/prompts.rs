//! Instruction templates sent to the analysis model.
//!
//! Keeping both templates here means the JSON field list the model is asked
//! for sits next to nothing else, and a change to it is one edit away from
//! the matching serde types in [`crate::output`]. Unit tests inspect the
//! templates directly.
//!
//! Placeholders: `{source}`, `{content}` and `{categories}` are substituted
//! by [`build_instruction`].

use crate::vocabulary::{CategoryVocabulary, ContentType};

/// Template for articles, tutorials, and news pieces.
pub const ARTICLE_TEMPLATE: &str = r#"You are an expert in artificial intelligence. Analyse the following content (an article, tutorial, or news item about AI) and answer with a structured JSON object.

SOURCE: {source}

CONTENT TO ANALYSE:
{content}

---

Reply ONLY with a valid JSON object (no markdown, no ```json fences) with exactly this structure:

{
    "title": "Proposed title for the article (concise and informative)",
    "summary": "Detailed summary of the content in 3-4 paragraphs. Explain the subject, the key concepts, the practical implications and the outlook. The summary must convey the essentials without reading the original.",
    "main_points": [
        "Key point 1 - an important aspect of the content",
        "Key point 2 - a concept or technique explained",
        "Key point 3 - a practical implication",
        "Key point 4 - another notable element",
        "Key point 5 - conclusion or outlook"
    ],
    "analysis": {
        "topic_type": "Kind of content (tutorial, news, research, opinion, comparison...)",
        "difficulty_level": "Difficulty (beginner, intermediate, advanced)",
        "technologies_mentioned": ["Technologies and tools mentioned"],
        "key_takeaways": ["Takeaway 1", "Takeaway 2", "Takeaway 3"],
        "practical_applications": ["Practical application 1", "Practical application 2"]
    },
    "suggested_categories": ["llm-modeles-langage", "outils-frameworks"]
}

The available categories are: {categories}

Make sure the JSON is valid and complete."#;

/// Template for prompts submitted for cleanup and cataloguing.
pub const PROMPT_TEMPLATE: &str = r#"You are an expert in prompt engineering. Analyse the following prompt and rewrite it so that it can be used as is.

SOURCE: {source}

PROMPT TO ANALYSE:
{content}

---

Reply ONLY with a valid JSON object (no markdown, no ```json fences) with exactly this structure:

{
    "title": "Descriptive name for the prompt (e.g. 'Python code generator with explanations')",
    "summary": "Short description of the prompt: what it does, when to use it, and the expected results (2-3 sentences).",
    "main_points": [
        "Use case 1",
        "Use case 2",
        "Use case 3"
    ],
    "formatted_prompt": "The rewritten, cleaned-up and optimised prompt. It must be ready to copy and use. Use clear placeholders in square brackets [like this] for variables. Keep the original structure if it is good, otherwise improve it.",
    "analysis": {
        "prompt_type": "Kind of prompt (system prompt, user prompt, few-shot, chain of thought...)",
        "complexity": "Complexity (simple, moderate, complex)",
        "variables": ["Variables and placeholders used in the prompt"],
        "best_practices": ["Best practice used 1", "Best practice used 2"],
        "suggestions": ["Suggested improvement 1", "Suggested improvement 2"]
    },
    "suggested_categories": ["prompt-developpement"]
}

The available categories are: {categories}

IMPORTANT: the "formatted_prompt" field must hold the ready-to-use prompt, well structured with appropriate line breaks (\n for new lines).

Make sure the JSON is valid and complete."#;

/// The template for a content type.
pub fn template(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Article => ARTICLE_TEMPLATE,
        ContentType::Prompt => PROMPT_TEMPLATE,
    }
}

/// Fill in a template.
///
/// Placeholders are replaced in one pass over the template, so a value that
/// itself contains `{content}` or `{categories}` is sent verbatim.
pub fn build_instruction(
    content_type: ContentType,
    content: &str,
    source_url: Option<&str>,
    vocabulary: &CategoryVocabulary,
) -> String {
    let categories = vocabulary.joined(content_type);
    fill(
        template(content_type),
        &[
            ("source", source_url.unwrap_or("")),
            ("categories", &categories),
            ("content", content),
        ],
    )
}

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = values
            .iter()
            .find(|(key, _)| tail.starts_with(*key) && tail[key.len()..].starts_with('}'));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

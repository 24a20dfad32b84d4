//! Deterministic HTML rendering of parsed model output.
//!
//! Every model-supplied string is escaped before it is placed in markup, and
//! the templates only use elements the sanitizer keeps (`p`, `strong`,
//! `span`, `code`, `ul`, `li`, `pre`), so sanitizing a rendered fragment
//! removes nothing. The parser still runs every fragment through the
//! sanitizer before calling it safe.
//!
//! Empty strings and empty lists render to nothing; a section whose source
//! field is empty is left out entirely.

use crate::output::{ArticleAnalysis, PromptAnalysis};
use crate::sanitize::{escape_html, PROMPT_BLOCK_CLASS};

/// `<ul><li>…</li></ul>` in source order, or `""` when there is nothing to list.
pub fn render_list(items: &[String]) -> String {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul>");
    for item in items {
        html.push_str("<li>");
        html.push_str(&escape_html(item));
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

/// Main points are a plain bullet list.
pub fn render_main_points(points: &[String]) -> String {
    render_list(points)
}

/// Badges, then the technology tags, then takeaways and applications.
pub fn render_article_analysis(analysis: &ArticleAnalysis) -> String {
    let mut html = String::new();
    html.push_str(&badges(&[&analysis.topic_type, &analysis.difficulty_level]));
    html.push_str(&tag_section("Technologies mentioned", &analysis.technologies_mentioned));
    html.push_str(&list_section("Key takeaways", &analysis.key_takeaways));
    html.push_str(&list_section(
        "Practical applications",
        &analysis.practical_applications,
    ));
    html
}

pub fn render_prompt_analysis(analysis: &PromptAnalysis) -> String {
    let mut html = String::new();
    html.push_str(&badges(&[&analysis.prompt_type, &analysis.complexity]));
    html.push_str(&tag_section("Variables", &analysis.variables));
    html.push_str(&list_section("Best practices used", &analysis.best_practices));
    html.push_str(&list_section("Suggested improvements", &analysis.suggestions));
    html
}

/// The ready-to-use prompt as a `<pre class="prompt-content">` block.
pub fn render_formatted_prompt(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return String::new();
    }
    format!(
        r#"<pre class="{PROMPT_BLOCK_CLASS}">{}</pre>"#,
        escape_html(prompt)
    )
}

fn badges(values: &[&String]) -> String {
    let spans: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| format!("<span>{}</span>", escape_html(v)))
        .collect();
    if spans.is_empty() {
        return String::new();
    }
    format!("<p>{}</p>", spans.join(" "))
}

fn heading(title: &str) -> String {
    format!("<p><strong>{title}</strong></p>")
}

fn tag_section(title: &str, tags: &[String]) -> String {
    let codes: Vec<String> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("<code>{}</code>", escape_html(t)))
        .collect();
    if codes.is_empty() {
        return String::new();
    }
    format!("{}<p>{}</p>", heading(title), codes.join(" "))
}

fn list_section(title: &str, items: &[String]) -> String {
    let list = render_list(items);
    if list.is_empty() {
        return list;
    }
    format!("{}{}", heading(title), list)
}

//! Allow-list HTML sanitizer.
//!
//! Every HTML-bearing field that leaves this crate goes through
//! [`HtmlSanitizer::sanitize`], and the only way to obtain a [`SafeHtml`]
//! value is through it. Downstream code renders `SafeHtml` unescaped, so the
//! sanitizer never fails: anything it does not understand is dropped or
//! escaped rather than reported.
//!
//! ## Passes
//!
//! A single left-to-right scan rebuilds the markup. Allow-listed tags are
//! re-emitted from scratch with only the attributes the policy grants; every
//! other tag is dropped while its text is kept. A `<` that does not open a
//! well-formed tag is escaped to `&lt;`, so nothing the scan emits as text can
//! reassemble into a tag.
//!
//! Raw-text containers (`script`, `style`, `iframe`, …) are recognised only
//! where the scan finds a real opening tag, and are removed together with
//! everything up to their closing tag (or the end of input when unclosed).
//!
//! Raw newlines outside lists, tables, and preformatted blocks get a `<br>`
//! in front of them unless the previous emitted token already is one, which
//! keeps `sanitize(sanitize(x)) == sanitize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Path prefix under which locally uploaded images are served.
pub const DEFAULT_UPLOAD_PREFIX: &str = "/uploads/";

/// Inline style forced onto every kept image.
pub const IMAGE_STYLE: &str = "max-width: 100%; height: auto;";

/// The only `class` value a `<pre>` block may keep.
pub const PROMPT_BLOCK_CLASS: &str = "prompt-content";

const ALLOWED_TAGS: &[&str] = &[
    "p", "b", "strong", "i", "em", "u", "sub", "sup", "br", "ol", "ul", "li", "table", "thead",
    "tbody", "tfoot", "tr", "th", "td", "caption", "colgroup", "col", "pre", "code", "a", "img",
    "span", "figure", "figcaption",
];

const VOID_TAGS: &[&str] = &["br", "img", "col"];

/// Inside these, newlines are left alone.
const STRUCTURAL_TAGS: &[&str] = &["ul", "ol", "table", "pre"];

/// Removed together with everything they contain.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "title",
    "svg", "math",
];

static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#).unwrap()
});

static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static DEFAULT_SANITIZER: Lazy<HtmlSanitizer> = Lazy::new(HtmlSanitizer::default);

// ── SafeHtml ─────────────────────────────────────────────────────────────

/// A string that has passed the sanitizer.
///
/// There is deliberately no public constructor and no `Deserialize` impl:
/// a `SafeHtml` read back from storage must be sanitized again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain-text preview: tags removed, basic entities decoded, whitespace
    /// collapsed, and truncated to `max_chars` characters followed by `...`.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = RE_ANY_TAG.replace_all(&self.0, " ");
        let text = decode_basic_entities(&text).replace('\u{a0}', " ");
        let text = RE_WHITESPACE.replace_all(text.trim(), " ");

        if text.chars().count() <= max_chars {
            return text.into_owned();
        }
        let mut short: String = text.chars().take(max_chars).collect();
        short.push_str("...");
        short
    }
}

impl AsRef<str> for SafeHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Sanitizer ────────────────────────────────────────────────────────────

/// Sanitize with the default policy (uploads served from `/uploads/`).
pub fn sanitize(html: &str) -> SafeHtml {
    DEFAULT_SANITIZER.sanitize(html)
}

/// Allow-list HTML rewriter.
///
/// The only configurable part of the policy is where local uploads live;
/// images pointing there are kept alongside absolute `http(s)` images.
#[derive(Debug, Clone)]
pub struct HtmlSanitizer {
    upload_prefix: String,
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_PREFIX)
    }
}

impl HtmlSanitizer {
    pub fn new(upload_prefix: impl Into<String>) -> Self {
        Self {
            upload_prefix: upload_prefix.into(),
        }
    }

    pub fn upload_prefix(&self) -> &str {
        &self.upload_prefix
    }

    /// Rewrite `html` so that only allow-listed markup survives.
    pub fn sanitize(&self, html: &str) -> SafeHtml {
        if html.is_empty() {
            return SafeHtml::default();
        }

        let mut out = Writer::with_capacity(html.len());
        let mut rest = html;

        while let Some(pos) = rest.find('<') {
            out.text(&rest[..pos]);
            let candidate = &rest[pos..];
            match scan_markup(candidate) {
                Markup::Skip(len) => {
                    out.removed += 1;
                    rest = &candidate[len..];
                }
                Markup::Tag(tag) if !tag.closing && RAW_TEXT_TAGS.contains(&tag.name.as_str()) => {
                    out.removed += 1;
                    let body = &candidate[tag.len..];
                    rest = match raw_text_end(body, &tag.name) {
                        Some(end) => &body[end..],
                        None => "",
                    };
                }
                Markup::Tag(tag) => {
                    self.emit_tag(&mut out, &tag);
                    rest = &candidate[tag.len..];
                }
                Markup::Text => {
                    out.text("&lt;");
                    rest = &candidate[1..];
                }
            }
        }
        out.text(rest);

        if out.removed > 0 {
            debug!(removed = out.removed, "Sanitizer dropped disallowed markup");
        }
        SafeHtml(out.html)
    }

    fn emit_tag(&self, out: &mut Writer, tag: &Tag<'_>) {
        let name = tag.name.as_str();
        if !ALLOWED_TAGS.contains(&name) {
            out.removed += 1;
            return;
        }

        if tag.closing {
            if VOID_TAGS.contains(&name) {
                return;
            }
            // Closing anchors follow the fate of their opening tag.
            if name == "a" && !out.anchors.pop().unwrap_or(false) {
                return;
            }
            if STRUCTURAL_TAGS.contains(&name) {
                out.structural_depth = out.structural_depth.saturating_sub(1);
            }
            out.tag(&format!("</{name}>"), false);
            return;
        }

        match name {
            "a" => {
                let href = attribute(tag.attrs, "href")
                    .map(|h| h.trim().to_string())
                    .filter(|h| is_safe_href(h));
                match href {
                    Some(href) => {
                        out.anchors.push(true);
                        out.tag(
                            &format!(
                                r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
                                escape_html(&href)
                            ),
                            false,
                        );
                    }
                    None => {
                        out.anchors.push(false);
                        out.removed += 1;
                    }
                }
            }
            "img" => {
                let src = attribute(tag.attrs, "src")
                    .map(|s| s.trim().to_string())
                    .filter(|s| self.is_safe_src(s));
                match src {
                    Some(src) => {
                        let alt = attribute(tag.attrs, "alt").unwrap_or_default();
                        out.tag(
                            &format!(
                                r#"<img src="{}" alt="{}" style="{IMAGE_STYLE}">"#,
                                escape_html(&src),
                                escape_html(&alt)
                            ),
                            false,
                        );
                    }
                    None => out.removed += 1,
                }
            }
            "pre" => {
                out.structural_depth += 1;
                let is_prompt_block = attribute(tag.attrs, "class")
                    .is_some_and(|class| class.trim() == PROMPT_BLOCK_CLASS);
                if is_prompt_block {
                    out.tag(&format!(r#"<pre class="{PROMPT_BLOCK_CLASS}">"#), false);
                } else {
                    out.tag("<pre>", false);
                }
            }
            "br" => out.tag("<br>", true),
            _ => {
                if STRUCTURAL_TAGS.contains(&name) {
                    out.structural_depth += 1;
                }
                out.tag(&format!("<{name}>"), false);
            }
        }
    }

    fn is_safe_src(&self, src: &str) -> bool {
        let lower = src.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return true;
        }
        src.starts_with(&self.upload_prefix) && !src.contains("..")
    }
}

fn is_safe_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || href.starts_with('#')
}

/// Byte offset just past `</name\s*>` in `body`, matched case-insensitively.
fn raw_text_end(body: &str, name: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets valid for `body`.
    let lower = body.to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let after_name = from + i + needle.len();
        let tail = &lower[after_name..];
        let gap = tail.len() - tail.trim_start().len();
        if tail[gap..].starts_with('>') {
            return Some(after_name + gap + 1);
        }
        from = after_name;
    }
    None
}

// ── Output writer ────────────────────────────────────────────────────────

struct Writer {
    html: String,
    /// Open `ul`/`ol`/`table`/`pre` elements.
    structural_depth: usize,
    /// Last emitted token was a `<br>` (ignoring spaces and tabs).
    after_break: bool,
    /// One entry per open `<a>`: whether it was kept.
    anchors: Vec<bool>,
    removed: usize,
}

impl Writer {
    fn with_capacity(n: usize) -> Self {
        Self {
            html: String::with_capacity(n + n / 8),
            structural_depth: 0,
            after_break: false,
            anchors: Vec::new(),
            removed: 0,
        }
    }

    fn text(&mut self, s: &str) {
        for c in s.chars() {
            match c {
                '\n' => {
                    if self.structural_depth == 0 && !self.after_break {
                        self.html.push_str("<br>");
                    }
                    self.html.push('\n');
                    self.after_break = false;
                }
                ' ' | '\t' | '\r' => self.html.push(c),
                _ => {
                    self.html.push(c);
                    self.after_break = false;
                }
            }
        }
    }

    fn tag(&mut self, html: &str, is_break: bool) {
        self.html.push_str(html);
        self.after_break = is_break;
    }
}

// ── Markup scanning ──────────────────────────────────────────────────────

enum Markup<'a> {
    /// Comment, doctype or processing instruction of this byte length.
    Skip(usize),
    Tag(Tag<'a>),
    /// The `<` does not start markup.
    Text,
}

struct Tag<'a> {
    len: usize,
    closing: bool,
    name: String,
    attrs: &'a str,
}

/// Classify the markup starting at `s[0] == '<'`.
fn scan_markup(s: &str) -> Markup<'_> {
    if let Some(body) = s.strip_prefix("<!--") {
        // An unterminated comment swallows the rest, as browsers do.
        return match body.find("-->") {
            Some(end) => Markup::Skip(4 + end + 3),
            None => Markup::Skip(s.len()),
        };
    }
    if s.starts_with("<!") || s.starts_with("<?") {
        return match s.find('>') {
            Some(end) => Markup::Skip(end + 1),
            None => Markup::Text,
        };
    }

    let closing = s[1..].starts_with('/');
    let name_start = if closing { 2 } else { 1 };
    let name_len = s[name_start..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
        .count();
    if name_len == 0 || !s.as_bytes()[name_start].is_ascii_alphabetic() {
        return Markup::Text;
    }
    let name_end = name_start + name_len;

    let Some(close) = find_tag_end(&s[name_end..]) else {
        return Markup::Text;
    };

    Markup::Tag(Tag {
        len: name_end + close + 1,
        closing,
        name: s[name_start..name_end].to_ascii_lowercase(),
        attrs: &s[name_end..name_end + close],
    })
}

/// Offset of the `>` closing a tag, skipping over quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut last_significant: Option<char> = None;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
                last_significant = Some(c);
            }
            continue;
        }
        match c {
            '"' | '\'' if last_significant == Some('=') => quote = Some(c),
            '>' => return Some(i),
            c if c.is_whitespace() => {}
            c => last_significant = Some(c),
        }
    }
    None
}

/// First value of attribute `name`, entity-decoded. A bare attribute yields `""`.
fn attribute(attrs: &str, name: &str) -> Option<String> {
    RE_ATTR.captures_iter(attrs).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        Some(decode_basic_entities(raw))
    })
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-pass inverse of [`escape_html`] (plus `&nbsp;`). Unknown entities
/// are left untouched.
fn decode_basic_entities(s: &str) -> String {
    const ENTITIES: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#39;", '\''),
        ("&#039;", '\''),
        ("&#x27;", '\''),
        ("&nbsp;", '\u{a0}'),
    ];

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(e, _)| tail.starts_with(e)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMG_STYLE_ATTR: &str = r#"style="max-width: 100%; height: auto;""#;

    #[test]
    fn script_block_and_content_removed() {
        let out = sanitize("Hello <script>alert(1)</script> world");
        assert_eq!(out.as_str(), "Hello  world");
    }

    #[test]
    fn style_block_removed_case_insensitive() {
        let out = sanitize("<P>a</P><STYLE type=\"text/css\">p{color:red}</STYLE>b");
        assert_eq!(out.as_str(), "<p>a</p>b");
    }

    #[test]
    fn unclosed_script_swallows_rest() {
        let out = sanitize("safe <script>alert(1) and more");
        assert_eq!(out.as_str(), "safe ");
    }

    #[test]
    fn split_script_cannot_reassemble() {
        let out = sanitize("<scr<script></script>ipt>alert(1)</script>");
        assert!(!out.as_str().to_lowercase().contains("<script"), "got: {out}");
        assert_eq!(sanitize(out.as_str()), out);
    }

    #[test]
    fn script_text_inside_attribute_is_not_an_opener() {
        let out = sanitize(r#"<a title="<script>" href="https://e.com">link</a> and the rest"#);
        assert_eq!(
            out.as_str(),
            r#"<a href="https://e.com" target="_blank" rel="noopener noreferrer">link</a> and the rest"#
        );
    }

    #[test]
    fn raw_text_close_tag_is_case_insensitive() {
        let out = sanitize("a<STYLE>p{}</Style >b<iframe src=x></iframe>c");
        assert_eq!(out.as_str(), "abc");
    }

    #[test]
    fn disallowed_tags_unwrapped() {
        let out = sanitize(r#"<div class="x"><h1>Title</h1><font>text</font></div>"#);
        assert_eq!(out.as_str(), "Titletext");
    }

    #[test]
    fn attributes_stripped_from_plain_tags() {
        let out = sanitize(r#"<b onclick="steal()">bold</b> <td style="x">c</td>"#);
        assert_eq!(out.as_str(), "<b>bold</b> <td>c</td>");
    }

    #[test]
    fn span_loses_every_attribute() {
        let out = sanitize(r#"<span style="background:url(x)" onmouseover="y">t</span>"#);
        assert_eq!(out.as_str(), "<span>t</span>");
    }

    #[test]
    fn javascript_image_removed_entirely() {
        let out = sanitize(r#"<p>a<img src="javascript:alert(1)" alt="x">b</p>"#);
        assert_eq!(out.as_str(), "<p>ab</p>");
    }

    #[test]
    fn https_image_keeps_only_src_alt_style() {
        let out = sanitize(
            r#"<img src="https://example.com/a.png" alt="x" onerror="y()" width=5 class="big">"#,
        );
        assert_eq!(
            out.as_str(),
            format!(r#"<img src="https://example.com/a.png" alt="x" {IMG_STYLE_ATTR}>"#)
        );
    }

    #[test]
    fn image_alt_defaults_to_empty() {
        let out = sanitize(r#"<img src="http://example.com/a.png"/>"#);
        assert_eq!(
            out.as_str(),
            format!(r#"<img src="http://example.com/a.png" alt="" {IMG_STYLE_ATTR}>"#)
        );
    }

    #[test]
    fn upload_images_kept_but_not_traversal_or_protocol_relative() {
        let kept = sanitize(r#"<img src="/uploads/img_1.png" alt="chart">"#);
        assert!(kept.as_str().starts_with(r#"<img src="/uploads/img_1.png""#));

        assert_eq!(sanitize(r#"<img src="/uploads/../config.php">"#).as_str(), "");
        assert_eq!(sanitize(r#"<img src="//evil.example/x.png">"#).as_str(), "");
        assert_eq!(sanitize(r#"<img src="data:image/png;base64,AAAA">"#).as_str(), "");
    }

    #[test]
    fn custom_upload_prefix() {
        let s = HtmlSanitizer::new("/blog/uploads/");
        assert!(!s.sanitize(r#"<img src="/blog/uploads/a.png">"#).is_empty());
        assert!(s.sanitize(r#"<img src="/uploads/a.png">"#).is_empty());
    }

    #[test]
    fn javascript_anchor_unwrapped_to_text() {
        let out = sanitize(r#"<a href="javascript:alert(1)" onclick="x">click</a> me"#);
        assert_eq!(out.as_str(), "click me");
    }

    #[test]
    fn https_anchor_rewritten() {
        let out = sanitize(r#"<a href="https://example.com" class="x" onclick="y" target="_self">go</a>"#);
        assert_eq!(
            out.as_str(),
            r#"<a href="https://example.com" target="_blank" rel="noopener noreferrer">go</a>"#
        );
    }

    #[test]
    fn mailto_and_fragment_anchors_kept() {
        assert!(sanitize(r#"<a href="mailto:a@b.c">m</a>"#)
            .as_str()
            .starts_with(r#"<a href="mailto:a@b.c""#));
        assert!(sanitize(r##"<a href="#top">t</a>"##)
            .as_str()
            .starts_with(r##"<a href="#top""##));
    }

    #[test]
    fn anchor_without_href_dropped_with_its_closing_tag() {
        let out = sanitize(r#"<a name="x">n</a><a href="https://e.com">k</a>"#);
        assert_eq!(
            out.as_str(),
            r#"n<a href="https://e.com" target="_blank" rel="noopener noreferrer">k</a>"#
        );
    }

    #[test]
    fn entity_encoded_scheme_is_not_decoded_into_javascript() {
        let out = sanitize(r#"<a href="&#106;avascript:alert(1)">x</a>"#);
        assert_eq!(out.as_str(), "x");
    }

    #[test]
    fn href_is_escaped() {
        let out = sanitize(r#"<a href="https://e.com/?a=1&b=2&quot;">x</a>"#);
        assert!(
            out.as_str().contains(r#"href="https://e.com/?a=1&amp;b=2&quot;""#),
            "got: {out}"
        );
    }

    #[test]
    fn pre_keeps_only_prompt_class() {
        assert_eq!(
            sanitize(r#"<pre class="prompt-content">x</pre>"#).as_str(),
            r#"<pre class="prompt-content">x</pre>"#
        );
        assert_eq!(sanitize(r#"<pre class="evil">x</pre>"#).as_str(), "<pre>x</pre>");
        assert_eq!(
            sanitize(r#"<pre class="prompt-content other" style="x">x</pre>"#).as_str(),
            "<pre>x</pre>"
        );
    }

    #[test]
    fn newlines_become_breaks_outside_structures() {
        assert_eq!(sanitize("a\nb").as_str(), "a<br>\nb");
        assert_eq!(sanitize("a\n\nb").as_str(), "a<br>\n<br>\nb");
        assert_eq!(sanitize("a<br>\nb").as_str(), "a<br>\nb");
        assert_eq!(sanitize("a<br/> \r\nb").as_str(), "a<br> \r\nb");
    }

    #[test]
    fn newlines_untouched_inside_lists_tables_and_pre() {
        let list = "<ul>\n<li>x</li>\n</ul>";
        assert_eq!(sanitize(list).as_str(), list);
        let table = "<table>\n<tr><td>1</td></tr>\n</table>";
        assert_eq!(sanitize(table).as_str(), table);
        let pre = "<pre>line 1\nline 2</pre>\nafter";
        assert_eq!(sanitize(pre).as_str(), "<pre>line 1\nline 2</pre><br>\nafter");
    }

    #[test]
    fn single_line_gets_no_break() {
        assert!(!sanitize("just one line").as_str().contains("<br>"));
    }

    #[test]
    fn stray_angle_bracket_escaped() {
        assert_eq!(sanitize("a < b and 1<2").as_str(), "a &lt; b and 1&lt;2");
        assert_eq!(sanitize("<b unterminated").as_str(), "&lt;b unterminated");
    }

    #[test]
    fn comments_and_doctype_removed() {
        assert_eq!(sanitize("<!DOCTYPE html>a<!-- <b>hidden</b> -->b").as_str(), "ab");
        assert_eq!(sanitize("a<!-- never closed <b>x</b>").as_str(), "a");
    }

    #[test]
    fn quoted_gt_inside_attribute_does_not_end_tag() {
        let out = sanitize(r#"<a href="https://e.com" title="a>b">x</a>"#);
        assert_eq!(
            out.as_str(),
            r#"<a href="https://e.com" target="_blank" rel="noopener noreferrer">x</a>"#
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "Hello <script>alert(1)</script> world",
            "a\nb\n\nc",
            "<p>x</p>\n<ul>\n<li>1</li>\n</ul>\ntext",
            r#"<a href="https://e.com/?q=1&r='2'">l</a><a href="javascript:x">j</a>"#,
            r##"<a href="#x"><a href="vbscript:y">in</a>out</a>"##,
            r#"<img src="https://e.com/i.png" alt="&quot;q&quot; & 'a'">"#,
            r#"<img src="/uploads/a b.png" alt=unquoted>"#,
            "<pre class=\"prompt-content\">[VAR]\n{x}</pre>\n<b>t</b>",
            "1 < 2 &amp; 3 > 2 &nbsp;&copy;",
            "<br>\n<br><br>\n\n<div>\n</div>",
            "<table><tr><td>a\nb</td></tr></table>\n</table>\nz",
            "<scr<script></script>ipt>alert(1)</script>",
            "<span style=x>s</span><code class=c>c</code><figure><figcaption>f</figcaption></figure>",
            "",
        ];
        for input in inputs {
            let once = sanitize(input);
            let twice = sanitize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn excerpt_strips_decodes_and_truncates() {
        let html = sanitize("<p>Tom &amp; Jerry</p>\n<ul><li>one</li><li>two</li></ul>");
        assert_eq!(html.excerpt(100), "Tom & Jerry one two");
        assert_eq!(html.excerpt(5), "Tom &...");
    }

    #[test]
    fn escape_html_covers_all_five() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn decode_is_single_pass() {
        assert_eq!(decode_basic_entities("&amp;amp; &lt;b&gt; &unknown;"), "&amp; <b> &unknown;");
    }
}

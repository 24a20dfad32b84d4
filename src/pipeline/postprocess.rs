//! Post-processing: deterministic cleanup of raw model text before parsing.
//!
//! The instruction forbids code fences, but models still wrap their JSON in
//! ` ```json ... ``` ` often enough that the parser cannot assume bare JSON.
//! These rules are cheap, order-dependent string passes; none of them looks
//! inside the JSON.
//!
//! ## Rule Order
//!
//! Invisible characters at either end go first so a BOM in front of the
//! opening fence does not hide it. Inside the text they are left alone: a
//! zero-width joiner in a JSON string is part of the content. Fences are
//! stripped before the final trim.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model text.
///
/// 1. Strip leading and trailing invisible Unicode (BOM, zero-width spaces, ...)
/// 2. Trim surrounding whitespace
/// 3. Strip a leading ` ```json ` (or bare ` ``` `) fence
/// 4. Strip a trailing ` ``` ` fence
/// 5. Trim again
pub fn clean_model_text(input: &str) -> String {
    let s = trim_invisible(input);
    let s = strip_leading_fence(s.trim());
    let s = strip_trailing_fence(&s);
    s.trim().to_string()
}

// ── Rule 1: Trim invisible Unicode characters ───────────────────────────────

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

fn trim_invisible(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || INVISIBLE.contains(&c))
}

// ── Rules 3-4: Strip fences ──────────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:json)?[ \t]*\r?\n?\s*").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

fn strip_leading_fence(input: &str) -> String {
    RE_LEADING_FENCE.replace(input, "").into_owned()
}

fn strip_trailing_fence(input: &str) -> String {
    RE_TRAILING_FENCE.replace(input, "").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Pipeline stages for turning a submission into an analysed record.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ parse ──▶ render
//! (upload)  (text/pdf)  (API)   (fences)        (JSON)    (HTML)
//! ```
//!
//! 1. [`input`]   — filename dispatch and upload transport status
//! 2. [`extract`] — decode text files; PDFs go through the [`pdf`] strategies
//! 3. [`llm`]     — the Messages API call; the only stage with network I/O
//! 4. [`postprocess`] — strip code fences and invisible characters
//! 5. [`parse`]   — validate the JSON shape and filter categories
//! 6. [`render`]  — deterministic HTML for lists and analysis detail, which
//!    the parser then passes through the sanitizer

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod pdf;
pub mod postprocess;
pub mod render;

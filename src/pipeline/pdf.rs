//! PDF text recovery strategies.
//!
//! PDFs carry no guaranteed text layer, so extraction is a chain of
//! best-effort strategies tried in order. Each one either returns text or
//! reports that it could not; the caller applies the quality gate and moves
//! on to the next.
//!
//! 1. [`PdftotextStrategy`] runs a layout-preserving command-line extractor
//!    (poppler's `pdftotext`) when one is installed.
//! 2. [`StreamScrapeStrategy`] inflates every content stream and pulls the
//!    string operands of the `Tj` / `TJ` text operators out with regexes.
//!
//! Stream scraping is heuristic. It does not understand font encodings, so
//! CID fonts and remapped glyphs come out garbled or not at all. Adding a
//! real PDF parser means adding another [`PdfTextStrategy`]; the extractor
//! does not care which strategy produced the text.
//!
//! Both strategies block. The orchestrator runs them in `spawn_blocking`.

use flate2::{Decompress, FlushDecompress, Status};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Inflated streams are capped at this size.
const MAX_INFLATED_BYTES: u64 = 32 * 1024 * 1024;

/// The document being extracted: its bytes, and its on-disk path when known.
#[derive(Debug, Clone, Copy)]
pub struct PdfSource<'a> {
    pub bytes: &'a [u8],
    pub path: Option<&'a Path>,
}

impl<'a> PdfSource<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes, path: None }
    }

    pub fn with_path(bytes: &'a [u8], path: &'a Path) -> Self {
        Self {
            bytes,
            path: Some(path),
        }
    }
}

/// One way of recovering text from a PDF.
pub trait PdfTextStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Recovered text, or `None` when the strategy is unavailable or failed.
    ///
    /// The returned text is trimmed. An empty result is reported as `None`.
    fn extract(&self, source: &PdfSource<'_>) -> Option<String>;
}

// ── Strategy 1: external layout-preserving extractor ────────────────────────

/// Runs `<program> -layout <file> -` and takes its standard output.
#[derive(Debug, Clone)]
pub struct PdftotextStrategy {
    program: PathBuf,
    timeout: Duration,
}

impl PdftotextStrategy {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Spawn the extractor and wait for it, killing it at the deadline.
    ///
    /// `Ok(None)` covers every "ran but gave us nothing" case: non-zero exit,
    /// timeout. A missing program surfaces as `Err` with `NotFound`.
    fn run(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        let mut child = Command::new(&self.program)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        // Drained on its own thread so a chatty child never blocks on a full pipe.
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    "{} timed out after {:?}; falling back",
                    self.program.display(),
                    self.timeout
                );
                return Ok(None);
            }
            thread::sleep(Duration::from_millis(20));
        };

        let output = reader
            .join()
            .map_err(|_| io::Error::other("stdout reader panicked"))??;

        if !status.success() {
            debug!("{} exited with {}", self.program.display(), status);
            return Ok(None);
        }
        Ok(Some(output))
    }
}

impl PdfTextStrategy for PdftotextStrategy {
    fn name(&self) -> &'static str {
        "pdftotext"
    }

    fn extract(&self, source: &PdfSource<'_>) -> Option<String> {
        // The extractor needs a file; in-memory documents get a temp copy
        // that is deleted when `_tmp` drops.
        let _tmp;
        let path: Cow<'_, Path> = match source.path {
            Some(p) => Cow::Borrowed(p),
            None => {
                let mut tmp = match tempfile::Builder::new().suffix(".pdf").tempfile() {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Cannot stage PDF for {}: {}", self.name(), e);
                        return None;
                    }
                };
                if let Err(e) = tmp.write_all(source.bytes).and_then(|_| tmp.flush()) {
                    warn!("Cannot stage PDF for {}: {}", self.name(), e);
                    return None;
                }
                let p = tmp.path().to_path_buf();
                _tmp = tmp;
                Cow::Owned(p)
            }
        };

        match self.run(&path) {
            Ok(Some(out)) => {
                let text = String::from_utf8_lossy(&out).trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            Ok(None) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} is not installed", self.program.display());
                None
            }
            Err(e) => {
                warn!("{} failed to run: {}", self.program.display(), e);
                None
            }
        }
    }
}

// ── Strategy 2: content-stream scraping ─────────────────────────────────────

static RE_STREAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)stream(?:\r\n|\n|\r)?(.*?)(?:\r\n|\n|\r)?endstream").unwrap()
});

/// `(...) Tj` in group 1, `[...] TJ` in group 2, in document order.
static RE_TEXT_OPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s-u)\(((?:\\.|[^\\)])*)\)\s*Tj|\[((?:\((?:\\.|[^\\)])*\)|[^\]])*)\]\s*TJ",
    )
    .unwrap()
});

static RE_STRING_OPERAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)\(((?:\\.|[^\\)])*)\)").unwrap());

/// Scrapes `Tj` / `TJ` operands out of every (inflated) content stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamScrapeStrategy;

impl PdfTextStrategy for StreamScrapeStrategy {
    fn name(&self) -> &'static str {
        "stream-scrape"
    }

    fn extract(&self, source: &PdfSource<'_>) -> Option<String> {
        let text = scrape_text(source.bytes);
        (!text.is_empty()).then_some(text)
    }
}

/// Run the scraper over raw PDF bytes. Exposed for diagnostics.
pub fn scrape_text(pdf: &[u8]) -> String {
    let mut raw = String::new();
    let mut streams = 0usize;
    for caps in RE_STREAM.captures_iter(pdf) {
        streams += 1;
        let body = inflate(&caps[1]);
        let fragment = text_from_content_stream(&body);
        if !fragment.is_empty() {
            raw.push_str(&fragment);
            raw.push('\n');
        }
    }
    debug!("Scraped {} streams, {} raw bytes of text", streams, raw.len());
    clean_scraped(&raw)
}

/// zlib first, then raw deflate, then the bytes as they are.
fn inflate(stream: &[u8]) -> Cow<'_, [u8]> {
    if let Some(out) = inflate_complete(stream, true) {
        return Cow::Owned(out);
    }
    if let Some(out) = inflate_complete(stream, false) {
        return Cow::Owned(out);
    }
    Cow::Borrowed(stream)
}

/// Decompress, succeeding only if the compressed stream ends properly.
///
/// A truncated or garbage stream can decode to a few bytes of noise before
/// running dry, so partial output is never accepted.
fn inflate_complete(data: &[u8], zlib_header: bool) -> Option<Vec<u8>> {
    inflate_capped(data, zlib_header, MAX_INFLATED_BYTES as usize)
}

/// [`inflate_complete`] with an explicit output ceiling of `cap` bytes.
fn inflate_capped(data: &[u8], zlib_header: bool, cap: usize) -> Option<Vec<u8>> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out: Vec<u8> = Vec::with_capacity(data.len().saturating_mul(4).max(1024).min(cap));
    loop {
        if out.len() >= cap {
            return None;
        }
        if out.len() == out.capacity() {
            out.reserve_exact(out.len().min(cap - out.len()));
        }
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let input = &data[in_before as usize..];
        match inflater.decompress_vec(input, &mut out, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => return (!out.is_empty() && out.len() <= cap).then_some(out),
            Ok(_) if inflater.total_in() == in_before && inflater.total_out() == out_before => {
                return None
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

fn text_from_content_stream(stream: &[u8]) -> String {
    let mut text = String::new();
    for caps in RE_TEXT_OPS.captures_iter(stream) {
        if let Some(single) = caps.get(1) {
            text.push_str(&decode_operand(single.as_bytes()));
            text.push(' ');
        } else if let Some(array) = caps.get(2) {
            for part in RE_STRING_OPERAND.captures_iter(array.as_bytes()) {
                text.push_str(&decode_operand(&part[1]));
            }
            text.push(' ');
        }
    }
    text
}

/// Undo literal-string escapes, then read the bytes as UTF-8 or Latin-1.
fn decode_operand(raw: &[u8]) -> String {
    let bytes = unescape_literal(raw);
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        i += 1;
        if b != b'\\' || i >= raw.len() {
            out.push(b);
            continue;
        }
        let esc = raw[i];
        i += 1;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(esc),
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xFF) as u8);
            }
            // Line continuation.
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
    }
    out
}

/// Drop control characters, collapse whitespace runs, trim.
fn clean_scraped(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            continue;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

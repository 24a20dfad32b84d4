//! CLI binary for tipsheet.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `IngestConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tipsheet::{
    AnalysisResult, ContentType, FileInput, HtmlSanitizer, IngestConfig, IngestConfigBuilder,
    IngestProgressCallback, IngestRecord, Pipeline, ProgressCallback, ResponseParser, Stage,
    Submission, TextExtractor,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_start: std::sync::Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: std::sync::Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.stage_start
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Extracting",
        Stage::Analyze => "Analysing",
        Stage::Parse => "Parsing",
        Stage::Store => "Storing",
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut s) = self.stage_start.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_prefix(stage_label(stage));
        self.bar.set_message(match stage {
            Stage::Analyze => "waiting for the model…",
            _ => "",
        });
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let detail = if output_len > 0 {
            format!("{output_len:>6} bytes")
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {:<8} {:<13} {}",
            green("✓"),
            stage.to_string(),
            dim(&detail),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<8} {}  {}",
            red("✗"),
            stage.to_string(),
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Import an article from a Markdown file and print the record as JSON
  tipsheet import notes.md --type article --json

  # Import pasted text with a source URL
  tipsheet import --text "$(pbpaste)" --source-url https://example.com/post

  # Import a prompt, write the record to a file
  tipsheet import prompt.txt --type prompt -o prompt.json

  # Extract text only (no API key needed)
  tipsheet extract paper.pdf

  # Sanitize HTML from stdin
  echo '<p onclick="x()">hi</p>' | tipsheet sanitize

  # Re-parse a saved model response offline
  tipsheet parse response.txt --type prompt

SUPPORTED FILES:
  .md .txt   decoded as UTF-8, ISO-8859-1 or Windows-1252
  .pdf       pdftotext -layout when installed, else a built-in stream scraper

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       API key (CLAUDE_API_KEY is also accepted)
  TIPSHEET_API_URL        Messages endpoint override
  TIPSHEET_MODEL          Model ID override
  TIPSHEET_PDFTOTEXT      pdftotext program path, or "off"
  TIPSHEET_UPLOAD_PREFIX  Local image path prefix kept by the sanitizer
  RUST_LOG                Log filter; overrides -v
"#;

/// Analyse articles and prompts with an LLM and produce sanitized HTML.
#[derive(Parser, Debug)]
#[command(
    name = "tipsheet",
    version,
    about = "Analyse articles and prompts with an LLM and produce sanitized HTML records",
    long_about = "Turn pasted text, Markdown, plain-text or PDF files into draft knowledge-base \
records: the content is analysed by an LLM, the answer is validated, and every HTML fragment is \
passed through an allow-list sanitizer.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More logging: -v for info, -vv for debug.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress everything except errors.
    #[arg(short, long, global = true, env = "TIPSHEET_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract plain text from a .md, .txt or .pdf file.
    Extract(ExtractArgs),
    /// Sanitize an HTML fragment (stdin when no file is given).
    Sanitize(SanitizeArgs),
    /// Parse a saved model response into a validated result.
    Parse(ParseArgs),
    /// Extract, analyse and parse one submission.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// File to extract.
    file: PathBuf,

    /// pdftotext program, or "off" to use only the built-in scraper.
    #[arg(long, env = "TIPSHEET_PDFTOTEXT")]
    pdftotext: Option<String>,
}

#[derive(Args, Debug)]
struct SanitizeArgs {
    /// HTML file; reads stdin when absent.
    file: Option<PathBuf>,

    /// Local image path prefix to keep.
    #[arg(long, env = "TIPSHEET_UPLOAD_PREFIX")]
    upload_prefix: Option<String>,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// File holding raw model text; reads stdin when absent.
    file: Option<PathBuf>,

    /// Content type the response was produced for.
    #[arg(long = "type", value_enum, default_value = "article")]
    content_type: TypeArg,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// .md, .txt or .pdf file; replaces --text when given.
    file: Option<PathBuf>,

    /// Pasted content.
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    #[arg(long = "type", value_enum, default_value = "article")]
    content_type: TypeArg,

    /// Where the content came from.
    #[arg(long)]
    source_url: Option<String>,

    /// Model ID.
    #[arg(long, env = "TIPSHEET_MODEL")]
    model: Option<String>,

    /// Max generated tokens.
    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,

    /// Analysis request timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// Print the full record as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Write the JSON record to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "TIPSHEET_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Article,
    Prompt,
}

impl From<TypeArg> for ContentType {
    fn from(v: TypeArg) -> Self {
        match v {
            TypeArg::Article => ContentType::Article,
            TypeArg::Prompt => ContentType::Prompt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Extract(args) => run_extract(args).await,
        Command::Sanitize(args) => run_sanitize(args),
        Command::Parse(args) => run_parse(args),
        Command::Import(args) => run_import(args, cli.quiet).await,
    }
}

async fn run_extract(args: ExtractArgs) -> Result<()> {
    let mut builder = IngestConfig::builder_from_env();
    if let Some(ref program) = args.pdftotext {
        builder = with_pdftotext(builder, program);
    }
    let config = builder.build().context("Invalid configuration")?;
    let extractor = TextExtractor::new(&config);
    let filename = display_name(&args.file);
    let path = args.file.clone();

    let text = tokio::task::spawn_blocking(move || extractor.extract_file(&path, &filename))
        .await
        .context("Extraction task panicked")?
        .with_context(|| format!("Failed to extract {}", args.file.display()))?;

    write_stdout(text.as_str())
}

fn run_sanitize(args: SanitizeArgs) -> Result<()> {
    let html = read_input(args.file.as_deref())?;
    let sanitizer = match args.upload_prefix {
        Some(prefix) => HtmlSanitizer::new(prefix),
        None => HtmlSanitizer::default(),
    };
    write_stdout(sanitizer.sanitize(&html).as_str())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let raw = read_input(args.file.as_deref())?;
    let config = IngestConfig::builder_from_env()
        .build()
        .context("Invalid configuration")?;
    let parser = ResponseParser::new(Arc::new(config));
    let result = parser
        .parse(&raw, args.content_type.into())
        .context("Failed to parse model response")?;
    let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
    write_stdout(&json)
}

async fn run_import(args: ImportArgs, quiet: bool) -> Result<()> {
    let show_progress = !quiet && !args.no_progress && !args.json;
    let progress = show_progress.then(CliProgressCallback::new);

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = IngestConfig::builder_from_env()
        .max_tokens(args.max_tokens)
        .api_timeout_secs(args.api_timeout);
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;
    let pipeline = Pipeline::new(config).context("Failed to set up the pipeline")?;

    // ── Build submission ─────────────────────────────────────────────────
    let content_type: ContentType = args.content_type.into();
    let mut submission = match args.file {
        Some(ref path) => Submission::file(
            content_type,
            FileInput::Path {
                path: path.clone(),
                filename: display_name(path),
            },
        ),
        None => {
            let text = match args.text {
                Some(ref text) => text.clone(),
                None => read_input(None)?,
            };
            Submission::text(content_type, text)
        }
    };
    if let Some(ref url) = args.source_url {
        submission = submission.with_source_url(url.clone());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = pipeline.ingest(submission).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let record = outcome.context("Import failed")?;

    if let Some(ref path) = args.output {
        let json = serde_json::to_string_pretty(&record).context("Failed to serialise record")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !quiet {
            eprintln!(
                "{}  {}  {}ms  →  {}",
                green("✔"),
                bold(&record.title),
                record.stats.total_ms,
                bold(&path.display().to_string())
            );
        }
    } else if args.json {
        let json = serde_json::to_string_pretty(&record).context("Failed to serialise record")?;
        write_stdout(&json)?;
    } else {
        print_summary(&record)?;
    }

    Ok(())
}

fn print_summary(record: &IngestRecord) -> Result<()> {
    let mut out = String::new();
    out.push_str(&format!("Title:       {}\n", record.title));
    out.push_str(&format!("Type:        {}\n", record.content_type));
    if let Some(ref source) = record.source_url {
        out.push_str(&format!("Source:      {}\n", source));
    }
    out.push_str(&format!("Categories:  {}\n", record.category_slugs.join(", ")));
    out.push_str(&format!(
        "Summary:     {}\n",
        record.result.summary().html.excerpt(300)
    ));
    out.push_str("Points:\n");
    for point in &record.result.main_points().raw {
        out.push_str(&format!("  - {}\n", point));
    }
    if let AnalysisResult::Prompt(ref p) = record.result {
        out.push_str("Prompt:\n");
        for line in p.formatted_prompt.raw.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    write_stdout(&out)
}

fn with_pdftotext(builder: IngestConfigBuilder, program: &str) -> IngestConfigBuilder {
    if program.eq_ignore_ascii_case("off") {
        builder.pdftotext(None::<PathBuf>)
    } else {
        builder.pdftotext(Some(program))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

//! Full-pipeline tests against an in-process stand-in for the Messages API.
//!
//! No network access or API key is needed.

mod common;

use common::{article_json, config_for, envelope, prompt_json, MockServer};
use std::cell::RefCell;
use std::io::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tipsheet::{
    AnalysisError, AnalysisResult, ContentType, ExtractionError, FileInput, IngestError,
    IngestProgressCallback, IngestRecord, ParseError, Pipeline, RecordStatus, RecordStore, Stage,
    Submission, UploadStatus, UploadedFile,
};

// ── Happy paths ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn article_from_pasted_text() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let record = pipeline
        .ingest(
            Submission::text(ContentType::Article, "  Tokio is an async runtime.  ")
                .with_source_url("https://example.com/tokio"),
        )
        .await
        .unwrap();

    assert_eq!(record.title, "Rust async in practice");
    assert_eq!(record.status, RecordStatus::Draft);
    assert_eq!(record.source_url.as_deref(), Some("https://example.com/tokio"));
    assert_eq!(record.source_content, "Tokio is an async runtime.");
    assert_eq!(record.category_slugs, ["outils-frameworks"]);
    assert_eq!(
        record.result.main_points().html.as_str(),
        "<ul><li>Use spawn_blocking for CPU work</li><li>Prefer bounded channels</li></ul>"
    );
    assert_eq!(
        record.result.summary().html.as_str(),
        "Tokio schedules tasks cooperatively.<br>\nBlocking calls belong on the blocking pool."
    );
    assert!(record
        .result
        .analysis_html()
        .as_str()
        .contains("<code>tokio</code>"));
    assert!(record.stats.response_chars > 0);
}

#[tokio::test]
async fn request_carries_headers_model_and_instruction() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    pipeline
        .ingest(
            Submission::text(ContentType::Article, "Body of the article")
                .with_source_url("https://example.com/a"),
        )
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert!(req.request_line.starts_with("POST /v1/messages"));
    assert_eq!(req.header("x-api-key"), Some("sk-test-key"));
    assert_eq!(req.header("anthropic-version"), Some("2023-06-01"));
    assert!(req
        .header("content-type")
        .is_some_and(|v| v.starts_with("application/json")));

    let body = req.json();
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["messages"][0]["role"], "user");
    let instruction = body["messages"][0]["content"].as_str().unwrap();
    assert!(instruction.contains("Body of the article"));
    assert!(instruction.contains("https://example.com/a"));
    assert!(instruction.contains("llm-modeles-langage"));
}

#[tokio::test]
async fn prompt_from_markdown_upload_defaults_source() {
    let server = MockServer::start(200, envelope(&prompt_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\n# Reviewer\nReview this [code].\n").unwrap();
    let upload = UploadedFile::ok("reviewer.md", file.path());

    let record = pipeline
        .ingest(Submission::upload(ContentType::Prompt, upload))
        .await
        .unwrap();

    assert_eq!(record.content_type, ContentType::Prompt);
    assert_eq!(record.source_url.as_deref(), Some("File: reviewer.md"));
    assert_eq!(record.source_content, "# Reviewer\nReview this [code].");
    let AnalysisResult::Prompt(ref prompt) = record.result else {
        panic!("expected a prompt result");
    };
    assert_eq!(
        prompt.formatted_prompt.html.as_str(),
        "<pre class=\"prompt-content\">Review the following [language] code:\n[code]</pre>"
    );
    assert_eq!(record.category_slugs, ["prompt-developpement"]);
}

#[tokio::test]
async fn file_replaces_pasted_text() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let submission = Submission::text(ContentType::Article, "pasted, ignored").with_file(
        FileInput::Bytes {
            filename: "notes.TXT".into(),
            bytes: b"from the file".to_vec(),
        },
    );
    let record = pipeline.ingest(submission).await.unwrap();

    assert_eq!(record.source_content, "from the file");
    let instruction = server.requests()[0].json()["messages"][0]["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(instruction.contains("from the file"));
    assert!(!instruction.contains("pasted, ignored"));
}

#[tokio::test]
async fn latin1_file_is_transcoded() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let record = pipeline
        .ingest(Submission::bytes(
            ContentType::Article,
            "caf\u{e9}.txt",
            b"Caf\xe9 cr\xe8me".to_vec(),
        ))
        .await
        .unwrap();

    assert_eq!(record.source_content, "Café crème");
}

#[tokio::test]
async fn fenced_model_reply_is_accepted() {
    let reply = format!("```json\n{}\n```", article_json());
    let server = MockServer::start(200, envelope(&reply)).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let record = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap();
    assert_eq!(record.title, "Rust async in practice");
}

// ── Failures surface unchanged ───────────────────────────────────────────────

#[tokio::test]
async fn remote_error_message_comes_from_envelope() {
    let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
    let server = MockServer::start(529, body).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    match err {
        IngestError::Analysis(AnalysisError::Remote { status, message }) => {
            assert_eq!(status, 529);
            assert_eq!(message, "Overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn remote_error_without_envelope_keeps_body() {
    let server = MockServer::start(500, "upstream exploded").await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Analysis(AnalysisError::Remote { status: 500, ref message })
            if message == "upstream exploded"
    ));
}

#[tokio::test]
async fn envelope_without_text_is_malformed() {
    let server = MockServer::start(200, r#"{"content":[]}"#).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Prompt, "text"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Analysis(AnalysisError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/v1/messages", listener.local_addr().unwrap());
    drop(listener);
    let pipeline = Pipeline::new(config_for(&url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Analysis(AnalysisError::Network { .. })));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start_with_delay(
        200,
        envelope(&article_json().to_string()),
        Duration::from_secs(5),
    )
    .await;
    let config = tipsheet::IngestConfig::builder()
        .api_url(&server.url)
        .api_key("sk-test-key")
        .api_timeout_secs(1)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    match err {
        IngestError::Analysis(AnalysisError::Network { detail }) => {
            assert!(detail.contains("timed out"), "detail: {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn prose_reply_is_invalid_json_with_raw_text() {
    let server = MockServer::start(200, envelope("Sorry, I can't help with that.")).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    match err {
        IngestError::Parse(ref e @ ParseError::InvalidJson { .. }) => {
            assert_eq!(e.raw_text(), Some("Sorry, I can't help with that."));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn article_schema_applied_to_prompt_reply() {
    // An article-shaped reply lacks formatted_prompt.
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Prompt, "text"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Parse(ParseError::SchemaViolation { ref field }) if field == "formatted_prompt"
    ));
}

#[tokio::test]
async fn empty_content_never_reaches_the_endpoint() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest(Submission::text(ContentType::Article, " \t\n"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::EmptyContent));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn upload_transport_error_is_reported() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();
    let upload = UploadedFile::new("big.pdf", "", UploadStatus::IniSize);

    let err = pipeline
        .ingest(Submission::upload(ContentType::Article, upload))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Extraction(ExtractionError::UploadTransport {
            status: UploadStatus::IniSize
        })
    ));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn image_only_pdf_is_low_yield() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();
    let pdf = b"%PDF-1.4\n1 0 obj << /Length 8 >>\nstream\nq Q q Q \nendstream\nendobj\n%%EOF";

    let err = pipeline
        .ingest(Submission::bytes(ContentType::Article, "scan.pdf", pdf.to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Extraction(ExtractionError::LowYield { .. })
    ));
}

// ── PDF via the stream scraper ───────────────────────────────────────────────

#[tokio::test]
async fn compressed_pdf_text_reaches_the_model() {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let content = b"BT /F1 12 Tf 72 720 Td (Large language models compress the web.) Tj \
                    0 -14 Td [(Retrieval) -250 ( adds fresh facts at query time.)] TJ ET";
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.5\n4 0 obj\n<< /Filter /FlateDecode /Length ");
    pdf.extend_from_slice(compressed.len().to_string().as_bytes());
    pdf.extend_from_slice(b" >>\nstream\n");
    pdf.extend_from_slice(&compressed);
    pdf.extend_from_slice(b"\nendstream\nendobj\n%%EOF\n");

    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();
    let record = pipeline
        .ingest(Submission::bytes(ContentType::Article, "paper.pdf", pdf))
        .await
        .unwrap();

    assert!(record
        .source_content
        .contains("Large language models compress the web."));
    assert!(record.source_content.contains("Retrieval"));
    assert_eq!(record.source_url.as_deref(), Some("File: paper.pdf"));
}

// ── Progress and storage ─────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl IngestProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.0.lock().unwrap().push(format!("start {stage}"));
    }
    fn on_stage_complete(&self, stage: Stage, _output_len: usize) {
        self.0.lock().unwrap().push(format!("done {stage}"));
    }
    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.0.lock().unwrap().push(format!("error {stage}"));
    }
}

/// In-memory store handing out sequential ids.
#[derive(Default)]
struct MemoryStore {
    records: RefCell<Vec<IngestRecord>>,
}

impl RecordStore for MemoryStore {
    type Id = usize;
    type Error = String;

    fn store(&self, record: &IngestRecord) -> Result<usize, String> {
        self.records.borrow_mut().push(record.clone());
        Ok(self.records.borrow().len())
    }
}

struct FailingStore;

impl RecordStore for FailingStore {
    type Id = ();
    type Error = &'static str;

    fn store(&self, _record: &IngestRecord) -> Result<(), &'static str> {
        Err("database is read-only")
    }
}

#[tokio::test]
async fn stages_report_in_order_and_record_is_stored() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let recorder = Arc::new(Recorder::default());
    let config = tipsheet::IngestConfig::builder()
        .api_url(&server.url)
        .api_key("sk-test-key")
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();
    let store = MemoryStore::default();

    let (id, record) = pipeline
        .ingest_into(
            &store,
            Submission::bytes(ContentType::Article, "a.md", b"# Title\nbody".to_vec()),
        )
        .await
        .unwrap();

    assert_eq!(id, 1);
    assert_eq!(store.records.borrow()[0], record);
    assert_eq!(
        *recorder.0.lock().unwrap(),
        [
            "start extract",
            "done extract",
            "start analyze",
            "done analyze",
            "start parse",
            "done parse",
            "start store",
            "done store",
        ]
    );
}

#[tokio::test]
async fn storage_failure_maps_to_storage_error() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Pipeline::new(config_for(&server.url)).unwrap();

    let err = pipeline
        .ingest_into(&FailingStore, Submission::text(ContentType::Article, "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Storage(ref m) if m == "database is read-only"));
}

#[tokio::test]
async fn pipeline_serves_concurrent_ingestions() {
    let server = MockServer::start(200, envelope(&article_json().to_string())).await;
    let pipeline = Arc::new(Pipeline::new(config_for(&server.url)).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .ingest(Submission::text(ContentType::Article, format!("article {i}")))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.title, "Rust async in practice");
    }
    assert_eq!(server.requests().len(), 4);
}

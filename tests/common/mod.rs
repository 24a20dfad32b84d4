//! Shared fixtures for integration tests: a one-route HTTP responder that
//! stands in for the Messages API, and canned payloads.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tipsheet::IngestConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Answers every request with the same status and body.
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    /// Like [`start`](Self::start), but waits `delay` before answering.
    pub async fn start_with_delay(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let body = Arc::new(body.into());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let body = Arc::clone(&body);
                let captured = Arc::clone(&captured);
                tokio::spawn(async move {
                    serve_one(stream, status, &body, delay, &captured).await;
                });
            }
        });

        Self {
            url: format!("http://{addr}/v1/messages"),
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_one(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    delay: Duration,
    captured: &Mutex<Vec<CapturedRequest>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    // Headers
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    // Body
    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let end = (body_start + content_length).min(buf.len());
    let request_body = String::from_utf8_lossy(&buf[body_start..end]).into_owned();

    captured.lock().unwrap().push(CapturedRequest {
        request_line,
        headers,
        body: request_body,
    });

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let response = format!(
        "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        reason(status),
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        529 => "Overloaded",
        _ => "Status",
    }
}

// ── Payloads ─────────────────────────────────────────────────────────────────

/// A Messages API success envelope carrying `text`.
pub fn envelope(text: &str) -> String {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 812, "output_tokens": 240}
    })
    .to_string()
}

pub fn article_json() -> serde_json::Value {
    serde_json::json!({
        "title": "Rust async in practice",
        "summary": "Tokio schedules tasks cooperatively.\nBlocking calls belong on the blocking pool.",
        "main_points": ["Use spawn_blocking for CPU work", "Prefer bounded channels"],
        "analysis": {
            "topic_type": "tutorial",
            "difficulty_level": "intermediate",
            "technologies_mentioned": ["Rust", "tokio"],
            "key_takeaways": ["Never block the executor"],
            "practical_applications": ["Web services"]
        },
        "suggested_categories": ["outils-frameworks", "not-a-category", "tutoriels-guides"]
    })
}

pub fn prompt_json() -> serde_json::Value {
    serde_json::json!({
        "title": "Code reviewer",
        "summary": "Reviews a diff for bugs.",
        "main_points": ["Pull request review"],
        "formatted_prompt": "Review the following [language] code:\n[code]",
        "analysis": {
            "prompt_type": "instruction",
            "complexity": "simple",
            "variables": ["[language]", "[code]"],
            "best_practices": ["Clear role"],
            "suggestions": ["Ask for severity levels"]
        },
        "suggested_categories": ["prompt-developpement"]
    })
}

/// Config pointed at `url`, with the PDF utility disabled for determinism.
pub fn config_for(url: &str) -> IngestConfig {
    IngestConfig::builder()
        .api_url(url)
        .api_key("sk-test-key")
        .api_timeout_secs(5)
        .pdftotext(None::<PathBuf>)
        .build()
        .expect("valid config")
}

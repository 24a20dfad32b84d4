//! The outbound analysis call.
//!
//! One request per ingestion: the instruction built by [`crate::prompts`]
//! goes out as a single user message, and the first content block of the
//! reply comes back untouched as [`RawModelText`]. Fence stripping and JSON
//! parsing belong to [`crate::pipeline::parse`].
//!
//! There is no retry. A failed call surfaces immediately and the caller
//! decides whether to resubmit.

use crate::config::IngestConfig;
use crate::error::AnalysisError;
use crate::prompts::build_instruction;
use crate::vocabulary::ContentType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Unparsed text generated by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelText(String);

impl RawModelText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for RawModelText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawModelText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Calls the configured Messages endpoint.
///
/// Cheap to share: holds an `Arc` of the configuration and a pooled
/// `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    config: Arc<IngestConfig>,
    http: reqwest::Client,
}

impl AnalysisClient {
    /// Fails with [`AnalysisError::NotConfigured`] when no real API key is
    /// set, so a misconfigured deployment never sends a request.
    pub fn new(config: Arc<IngestConfig>) -> Result<Self, AnalysisError> {
        if !config.has_api_key() {
            return Err(AnalysisError::NotConfigured);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ask the model for a structured analysis of `text`.
    ///
    /// # Errors
    /// * [`AnalysisError::Network`] if no HTTP status was received
    /// * [`AnalysisError::Remote`] for a non-2xx status
    /// * [`AnalysisError::MalformedResponse`] when a 2xx body has no text in
    ///   its first content block
    pub async fn analyze(
        &self,
        text: &str,
        source_url: Option<&str>,
        content_type: ContentType,
    ) -> Result<RawModelText, AnalysisError> {
        let instruction =
            build_instruction(content_type, text, source_url, &self.config.vocabulary);
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: [UserMessage {
                role: "user",
                content: &instruction,
            }],
        };

        info!(
            "Requesting {} analysis from {} ({} chars of content)",
            content_type,
            self.config.model,
            text.chars().count()
        );
        let start = Instant::now();

        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| self.network_error(e))?;
        debug!("Analysis API answered {} in {:?}", status, start.elapsed());

        if !status.is_success() {
            let message = remote_message(&payload);
            warn!("Analysis API error {}: {}", status.as_u16(), message);
            return Err(AnalysisError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        generated_text(&payload)
    }

    fn network_error(&self, e: reqwest::Error) -> AnalysisError {
        let detail = if e.is_timeout() {
            format!(
                "request timed out after {}s",
                self.config.api_timeout_secs
            )
        } else {
            e.without_url().to_string()
        };
        AnalysisError::Network { detail }
    }
}

/// The provider's `error.message`, or the whole body when it has none.
fn remote_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}

/// `content[0].text` from a success envelope.
fn generated_text(body: &str) -> Result<RawModelText, AnalysisError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| AnalysisError::MalformedResponse {
            detail: format!("response body is not a message envelope: {e}"),
        })?;

    if parsed.stop_reason.as_deref() == Some("max_tokens") {
        warn!("Analysis was cut short by max_tokens; the JSON is probably incomplete");
    }
    if let Some(usage) = &parsed.usage {
        debug!(
            "Token usage: {} in / {} out",
            usage.input_tokens, usage.output_tokens
        );
    }

    parsed
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .map(RawModelText)
        .ok_or_else(|| AnalysisError::MalformedResponse {
            detail: "missing content[0].text".to_string(),
        })
}

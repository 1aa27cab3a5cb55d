//! Generative-model service client.
//!
//! One logical operation: send a rendered prompt plus the declared output
//! shape, get the model's raw text back. The service is asked for structured
//! JSON output directly (`responseMimeType` + `responseSchema`), but the
//! returned text is still treated as untrusted: parsing it is the coercion
//! layer's job, so a garbled body surfaces as a parse failure rather than a
//! service failure.
//!
//! # Configuration
//!
//! The HTTP client is configured from the environment:
//!
//! - `GEMINI_API_KEY` — required credential; absence is an error at client
//!   construction, never a silent no-op.
//! - `FLEETWISE_MODEL` — model name (default `gemini-2.0-flash`).
//! - `FLEETWISE_ENDPOINT` — API base (default
//!   `https://generativelanguage.googleapis.com/v1beta`).
//! - `FLEETWISE_TIMEOUT_SECS` — whole-request timeout (default 20).
//!
//! # Error Mapping
//!
//! Transport failures, non-2xx statuses, and malformed response envelopes all
//! surface as service errors with the upstream detail preserved. There is no
//! retry or backoff at this layer; a caller wanting one wraps
//! [`GenerativeModel`].

use crate::error::FlowError;
use crate::schema::SchemaDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::{Duration, Instant};
use ureq::Agent;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// The single call contract every flow runs through.
///
/// `HttpModelClient` is the production implementation; tests substitute
/// doubles to script responses or to assert a call never happens.
pub trait GenerativeModel: Send + Sync {
    /// Execute one generation call and return the model's raw text output.
    fn generate(&self, prompt: &str, output_schema: &SchemaDescriptor)
        -> Result<String, FlowError>;
}

/// Connection settings for [`HttpModelClient`].
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ModelConfig {
    /// Resolve configuration from the environment.
    pub fn from_env() -> Result<Self, FlowError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| FlowError::service("GEMINI_API_KEY is not set"))?;
        let endpoint =
            env::var("FLEETWISE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model = env::var("FLEETWISE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = match env::var("FLEETWISE_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    FlowError::service(format!(
                        "FLEETWISE_TIMEOUT_SECS must be a number of seconds, got `{raw}`"
                    ))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Ok(ModelConfig {
            endpoint,
            model,
            api_key,
            timeout,
        })
    }
}

/// Blocking HTTPS client for the generative-language endpoint.
pub struct HttpModelClient {
    agent: Agent,
    config: ModelConfig,
}

impl HttpModelClient {
    pub fn new(config: ModelConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();
        HttpModelClient { agent, config }
    }

    pub fn from_env() -> Result<Self, FlowError> {
        Ok(Self::new(ModelConfig::from_env()?))
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl GenerativeModel for HttpModelClient {
    fn generate(
        &self,
        prompt: &str,
        output_schema: &SchemaDescriptor,
    ) -> Result<String, FlowError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: output_schema.to_response_schema(),
            },
        };

        let url = self.request_url();
        let started = Instant::now();
        let mut response = self
            .agent
            .post(url.as_str())
            .header("x-goog-api-key", &self.config.api_key)
            .send_json(&body)
            .map_err(|err| FlowError::service(format!("model request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.body_mut().read_to_string().unwrap_or_default();
            return Err(FlowError::service(format!(
                "model service returned {status}: {}",
                detail.trim()
            )));
        }

        let envelope: GenerateResponse = response.body_mut().read_json().map_err(|err| {
            FlowError::service(format!("model response envelope failed to parse: {err}"))
        })?;
        let text = envelope
            .first_text()
            .ok_or_else(|| FlowError::service("model response contained no candidate text"))?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = text.len(),
            "model call complete"
        );
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates.into_iter().find_map(|candidate| {
            candidate
                .content
                .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        })
    }
}

//! LLM Client: the single point of entry for all Gemini API calls.
//!
//! No other module talks to the generative-language API directly; everything
//! goes through `GenerativeModel`, implemented here by `GeminiClient`.
//!
//! Each call walks the configured model list in preference order. A model gets
//! a bounded number of attempts with exponential backoff on transient failures
//! (429, 5xx, transport errors) before the next model is tried.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const TEMPERATURE: f32 = 0.0;
const MAX_OUTPUT_TOKENS: u32 = 8192;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Longest API error message carried back to the caller.
const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing GEMINI_API_KEY in environment")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("API error from {model} (status {status}): {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    #[error("All model attempts failed after retries across {models} model(s). Try again later.")]
    Exhausted { models: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// A successful reply: the raw JSON body plus the model that produced it.
///
/// The body is kept untyped because the candidate layout varies between API
/// versions; see `candidate_text`.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub model_used: String,
    pub status: u16,
    pub body: Value,
}

impl ModelReply {
    pub fn text(&self) -> Option<&str> {
        candidate_text(&self.body)
    }
}

/// Locates the generated text in a `generateContent` response.
///
/// Tries `candidates[0].content.parts[0].text`, then `candidates[0].output`,
/// then `candidates[0]` itself when it is a plain string. Empty strings are
/// treated as absent.
pub fn candidate_text(body: &Value) -> Option<&str> {
    let first = body.get("candidates")?.get(0)?;

    let nested = first
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str);

    nested
        .filter(|s| !s.is_empty())
        .or_else(|| {
            first
                .get("output")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .or_else(|| first.as_str().filter(|s| !s.is_empty()))
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Attempts per model and the first backoff delay. The delay doubles after
/// each failed attempt and resets when moving to the next model.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the `failed_attempts`-th failure (1-based).
    pub fn backoff_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }

    /// Walks `models` in order, giving each up to `max_attempts` calls.
    ///
    /// `call` performs one attempt and yields the HTTP status and body, or a
    /// transport error. Transient statuses and transport errors are retried
    /// after `backoff_after`; there is no sleep after a model's last attempt.
    /// Any other non-success status ends the walk with `LlmError::Api`.
    pub async fn run<F, Fut, E>(&self, models: &[String], mut call: F) -> Result<ModelReply, LlmError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<(StatusCode, Value), E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);

        for model in models {
            for attempt in 1..=max_attempts {
                match call(model.clone()).await {
                    Ok((status, body)) if status.is_success() => {
                        debug!("Gemini call succeeded: model={model} attempt={attempt}");
                        return Ok(ModelReply {
                            model_used: model.clone(),
                            status: status.as_u16(),
                            body,
                        });
                    }
                    Ok((status, body)) if is_transient(status) => {
                        warn!(
                            "Transient error from {model} (status {}), attempt {attempt}/{max_attempts}: {}",
                            status.as_u16(),
                            api_error_message(&body)
                        );
                    }
                    Ok((status, body)) => {
                        return Err(LlmError::Api {
                            model: model.clone(),
                            status: status.as_u16(),
                            message: api_error_message(&body),
                        });
                    }
                    Err(e) => {
                        warn!("Exception calling {model}, attempt {attempt}/{max_attempts}: {e}");
                    }
                }

                if attempt < max_attempts {
                    let delay = self.backoff_after(attempt);
                    debug!("Retrying {model} after {}ms", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
            warn!("Exhausted retries for {model}, trying next model if available.");
        }

        Err(LlmError::Exhausted {
            models: models.len(),
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pulls `error.message` out of an API error body, falling back to the raw body.
fn api_error_message(body: &Value) -> String {
    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| match body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Model seam
// ────────────────────────────────────────────────────────────────────────────

/// The text-generation backend used by the question pipeline.
///
/// Carried in `AppState` as `Arc<dyn GenerativeModel>`.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ModelReply, LlmError>;
}

/// Gemini `generateContent` client with retry and model fallback.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    models: Vec<String>,
    policy: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        api_base: String,
        models: Vec<String>,
        policy: RetryPolicy,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            models,
            policy,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.api_base)
    }

    /// One POST to one model. The body is parsed as JSON when possible and
    /// kept as a raw string otherwise.
    async fn call_once(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<(StatusCode, Value), reqwest::Error> {
        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        let body = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        Ok((status, body))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<ModelReply, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let request = &request;
        self.policy
            .run(&self.models, |model| async move {
                self.call_once(&model, request).await
            })
            .await
    }
}


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::IntentError;
use crate::config::GeminiConfig;

const DEFAULT_RETRY_ATTEMPTS: u32 = 1;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
const EMBEDDING_TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";

/// Text-generation boundary used by the summary stage.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// Embedding boundary used by the embedding stage.
pub trait Embedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>>;
}

#[derive(Clone)]
pub struct GeminiClient {
    base_url: Url,
    generation_model: String,
    embedding_model: String,
    api_key: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl fmt::Debug for GeminiClient {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .field("generation_model", &self.generation_model)
            .field("embedding_model", &self.embedding_model)
            .field("api_key", &"<redacted>")
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content,
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl Content {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> Result<Self> {
        let base_url = config
            .endpoint()
            .context("Failed to build Gemini URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            api_key: api_key.into(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Generate text for a single prompt with the configured generation model.
    #[inline]
    pub fn generate_content(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting {} completion (prompt length: {})",
            self.generation_model,
            prompt.len()
        );

        let url = self.method_url(&self.generation_model, "generateContent")?;
        let request = GenerateRequest {
            contents: vec![Content::from_text(prompt)],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .context("Failed to generate content")?;

        let response: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generation response")?;

        extract_text(response)
    }

    /// Embed a single document with the configured embedding model.
    #[inline]
    pub fn embed_content(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = self.method_url(&self.embedding_model, "embedContent")?;
        let request = EmbedRequest {
            model: &self.embedding_model,
            content: Content::from_text(text),
            task_type: EMBEDDING_TASK_TYPE,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .post_json(&url, &request_json)
            .context("Failed to generate embedding")?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        if response.embedding.values.is_empty() {
            return Err(anyhow::anyhow!("Embedding response contained no values"));
        }

        debug!(
            "Generated embedding with {} dimensions",
            response.embedding.values.len()
        );
        Ok(response.embedding.values)
    }

    fn method_url(&self, model: &str, method: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/v1beta/{model}:{method}"))
            .with_context(|| format!("Failed to build {method} URL"))
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<String> {
        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("x-goog-api-key", &self.api_key)
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
                            warn!(
                                "Gemini returned status {}, attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(
                            EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000,
                        );
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow::anyhow!("Gemini response contained no text"));
    }
    Ok(text.to_string())
}

impl TextGenerator for GeminiClient {
    #[inline]
    fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.generate_content(prompt)
            .map_err(|e| IntentError::ExternalService(format!("{e:#}")))
    }
}

impl Embedder for GeminiClient {
    #[inline]
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        self.embed_content(text)
            .map_err(|e| IntentError::ExternalService(format!("{e:#}")))
    }
}

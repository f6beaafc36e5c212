use aegis_core::{BackendReply, Error, Invocation, ModelBackend, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// System prompt used when the request carries supporting context.
const CONTEXT_SYSTEM_PROMPT: &str =
    "Answer using the supplied context. If the context does not contain the answer, say so.";

/// Per-1k-token prices used to compute the actual cost of a call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenPricing {
    /// USD per 1000 prompt tokens.
    pub input_per_1k: f64,
    /// USD per 1000 completion tokens.
    pub output_per_1k: f64,
}

impl TokenPricing {
    /// Cost in USD for the given token counts.
    #[must_use]
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let input = prompt_tokens as f64 / 1000.0;
        let output = completion_tokens as f64 / 1000.0;
        input.mul_add(self.input_per_1k, output * self.output_per_1k)
    }
}

/// Backend speaking the OpenAI chat completions wire format.
///
/// Works against OpenAI itself and the many gateways and local servers
/// (vLLM, llama.cpp, Ollama) that expose the same endpoint.
pub struct OpenAiCompatibleBackend {
    /// HTTP client for API requests.
    client: Client,
    /// Full chat completions URL.
    endpoint: String,
    /// Bearer token, if the endpoint requires one.
    api_key: Option<String>,
    /// Model identifier sent with each request.
    model: String,
    /// Prices used for cost accounting.
    pricing: TokenPricing,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend for `model` served at `endpoint`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            pricing: TokenPricing::default(),
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the prices used for cost accounting.
    #[must_use]
    pub fn with_pricing(mut self, pricing: TokenPricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Applies a per-request timeout at the HTTP layer.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;
        Ok(self)
    }

    fn build_request(&self, invocation: &Invocation) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(context) = &invocation.context {
            messages.push(ChatMessage {
                role: "system".to_owned(),
                content: format!("{CONTEXT_SYSTEM_PROMPT}\n\nContext:\n{context}"),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_owned(),
            content: invocation.prompt.clone(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: invocation.temperature,
            max_tokens: invocation.max_tokens,
        }
    }

    fn into_reply(&self, payload: ChatResponse, latency_ms: u64) -> Result<BackendReply> {
        let text = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::InvalidResponse(format!("No choices from {}", self.model)))?;

        let cost = payload.usage.map_or(0.0, |usage| {
            self.pricing
                .cost(usage.prompt_tokens, usage.completion_tokens)
        });

        Ok(BackendReply {
            text,
            cost,
            latency_ms,
        })
    }
}

/// Request payload sent to the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// Model identifier.
    model: String,
    /// Conversation messages.
    messages: Vec<ChatMessage>,
    /// Sampling temperature.
    temperature: f32,
    /// Maximum completion tokens.
    max_tokens: u32,
}

/// Message sent to the endpoint.
#[derive(Debug, Serialize)]
struct ChatMessage {
    /// Author role (`system` or `user`).
    role: String,
    /// Message text.
    content: String,
}

/// Response payload returned by the endpoint.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Candidate completions.
    choices: Vec<ChatChoice>,
    /// Token accounting, absent on some local servers.
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// Generated message.
    message: ChatResponseMessage,
}

/// Generated message body.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// Generated text.
    content: String,
}

/// Token usage for one call.
#[derive(Debug, Deserialize)]
struct ChatUsage {
    /// Prompt tokens.
    prompt_tokens: u64,
    /// Completion tokens.
    completion_tokens: u64,
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    async fn invoke(&self, invocation: &Invocation) -> Result<BackendReply> {
        let start = Instant::now();
        let request = self.build_request(invocation);

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                }
            } else {
                Error::Unavailable(format!("{} request failed: {err}", self.model))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(classify_status(status, &self.model, &error_text));
        }

        let payload: ChatResponse = response.json().await.map_err(|err| {
            Error::InvalidResponse(format!("Failed to parse {} response: {err}", self.model))
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(model = %self.model, latency_ms, "backend call completed");
        self.into_reply(payload, latency_ms)
    }
}

/// Maps a non-success status to the backend error taxonomy.
fn classify_status(status: StatusCode, model: &str, body: &str) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Error::Unavailable(format!("{model} returned {status}: {body}"))
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Error::MissingApiKey(format!("{model} rejected credentials ({status})"))
    } else {
        Error::InvalidResponse(format!("{model} returned {status}: {body}"))
    }
}

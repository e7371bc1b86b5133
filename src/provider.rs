//! Generation Service Client
//!
//! The only network dependency of the pipeline. A [`CompletionTransport`] performs one
//! HTTP attempt against an OpenAI-compatible chat-completions endpoint; [`GenerationClient`]
//! wraps a transport with the retry/backoff state machine. Prompt construction and reply
//! decoding live elsewhere so the transport can be swapped for a scripted one in tests.

use crate::error::DevlogError;
use crate::prompt::GenerationRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub mod credentials;

pub use credentials::{resolve_api_key, CredentialsConfig};

/// Characters of an error response body kept for diagnostics
pub const ERROR_BODY_LIMIT: usize = 400;

/// One request/response exchange with the generation service
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Perform a single attempt and return the first completion's text.
    ///
    /// Transport failures map to `ProviderConnection`, non-2xx statuses to
    /// `ProviderHttp`; classification for retry is `DevlogError::is_retryable`.
    async fn send(&self, request: &GenerationRequest) -> Result<String, DevlogError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP settings for the chat-completions transport
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub endpoint: String,
    pub api_key: String,
    pub referer: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Chat-completions transport (OpenRouter by default)
pub struct OpenRouterTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    referer: Option<String>,
}

impl OpenRouterTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, DevlogError> {
        // The request timeout bounds each attempt; hitting it is a transport failure
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| DevlogError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint,
            api_key: settings.api_key,
            referer: settings.referer,
        })
    }
}

#[async_trait]
impl CompletionTransport for OpenRouterTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<String, DevlogError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(DevlogError::ProviderHttp {
                status: status.as_u16(),
                body: truncate_chars(&text, ERROR_BODY_LIMIT),
            });
        }

        parse_completion(&text)
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }
}

fn map_transport_error(error: reqwest::Error) -> DevlogError {
    if error.is_timeout() {
        DevlogError::ProviderConnection(format!("request timeout: {}", error))
    } else {
        DevlogError::ProviderConnection(error.to_string())
    }
}

/// Extract `choices[0].message.content` from a completion body.
pub fn parse_completion(body: &str) -> Result<String, DevlogError> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| DevlogError::ProviderResponse(format!("Failed to parse response: {}", e)))?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DevlogError::ProviderResponse("No choices in response".to_string()))?;
    let content = choice
        .message
        .content
        .ok_or_else(|| DevlogError::ProviderResponse("Completion has no content".to_string()))?;
    Ok(content.trim().to_string())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the `failed_attempt`-th failure (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What to do after recording an attempt's outcome
#[derive(Debug)]
pub enum RetryDecision {
    Succeeded(String),
    Backoff(Duration),
    Failed(DevlogError),
}

/// Explicit retry state: attempts made and total backoff slept so far
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
    elapsed_backoff: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            elapsed_backoff: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed_backoff(&self) -> Duration {
        self.elapsed_backoff
    }

    /// Transition on the outcome of the attempt just made.
    ///
    /// success -> `Succeeded`; terminal error -> `Failed(err)`; retryable error
    /// -> `Backoff(delay)` while attempts remain, else `Failed(ProviderRetriesExhausted)`.
    pub fn record(&mut self, outcome: Result<String, DevlogError>) -> RetryDecision {
        self.attempts += 1;
        match outcome {
            Ok(text) => RetryDecision::Succeeded(text),
            Err(err) if !err.is_retryable() => RetryDecision::Failed(err),
            Err(err) if self.attempts >= self.policy.max_attempts => {
                RetryDecision::Failed(DevlogError::ProviderRetriesExhausted {
                    attempts: self.attempts,
                    last_error: err.to_string(),
                })
            }
            Err(_) => {
                let delay = self.policy.delay_after(self.attempts);
                self.elapsed_backoff += delay;
                RetryDecision::Backoff(delay)
            }
        }
    }
}

/// Transport plus retry policy; shared across worker tasks
#[derive(Clone)]
pub struct GenerationClient {
    transport: Arc<dyn CompletionTransport>,
    policy: RetryPolicy,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn CompletionTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send one request, retrying transient failures per the policy.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, DevlogError> {
        let mut state = RetryState::new(self.policy);
        loop {
            let outcome = self.transport.send(request).await;
            if let Err(err) = &outcome {
                debug!(
                    provider = self.transport.provider_name(),
                    attempt = state.attempts() + 1,
                    error = %err,
                    "Generation attempt failed"
                );
            }
            match state.record(outcome) {
                RetryDecision::Succeeded(text) => return Ok(text),
                RetryDecision::Failed(err) => return Err(err),
                RetryDecision::Backoff(delay) => {
                    warn!(
                        provider = self.transport.provider_name(),
                        attempt = state.attempts(),
                        max_attempts = self.policy.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        "Transient generation failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

// Mock transport for unit tests
#[cfg(test)]
pub struct MockTransport {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, DevlogError>>>,
    calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(responses: Vec<Result<String, DevlogError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl CompletionTransport for MockTransport {
    async fn send(&self, _request: &GenerationRequest) -> Result<String, DevlogError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Mock response".to_string()))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use rentdesk_core::config::{LlmConfig, LlmProvider};

/// Reply substituted when the completion service gives no usable answer.
pub const FALLBACK_REPLY: &str = "AI could not find an answer.";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// The provider answered, but not in the shape we expect.
#[derive(Debug, Error)]
#[error("malformed completion response: {0}")]
pub struct MalformedReply(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompletionFailure {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion response was malformed: {0}")]
    Malformed(String),
}

impl CompletionFailure {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "completion_timeout",
            Self::Transport(_) => "completion_transport",
            Self::Malformed(_) => "completion_malformed",
        }
    }
}

/// One attempt, one bounded wait. Retries are the caller's business.
#[derive(Clone)]
pub struct CompletionClient {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionFailure> {
        let reply = match tokio::time::timeout(self.timeout, self.llm.complete(prompt)).await {
            Err(_) => return Err(CompletionFailure::Timeout(self.timeout)),
            Ok(Err(error)) if error.downcast_ref::<MalformedReply>().is_some() => {
                return Err(CompletionFailure::Malformed(error.to_string()))
            }
            Ok(Err(error)) => return Err(CompletionFailure::Transport(format!("{error:#}"))),
            Ok(Ok(reply)) => reply,
        };

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(CompletionFailure::Malformed("empty reply".to_string()));
        }
        Ok(reply.to_string())
    }
}

/// Completion client for the configured provider's HTTP API.
pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        // The outer timeout lives in `CompletionClient`; this only bounds a stuck socket.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.saturating_add(5)))
            .build()
            .context("failed to create HTTP client")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            client,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .context("llm.api_key is required for this provider")
    }

    fn request(&self, prompt: &str) -> Result<reqwest::RequestBuilder> {
        let request = match self.provider {
            LlmProvider::OpenAi => self
                .client
                .post(openai_endpoint(&self.base_url))
                .bearer_auth(self.api_key()?)
                .json(&json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }],
                    "temperature": 0.3,
                })),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", self.api_key()?)
                .header("anthropic-version", "2023-06-01")
                .json(&json!({
                    "model": self.model,
                    "max_tokens": 1024,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            LlmProvider::Ollama => {
                self.client.post(format!("{}/api/generate", self.base_url)).json(&json!({
                    "model": self.model,
                    "prompt": prompt,
                    "stream": false,
                }))
            }
            LlmProvider::Gemini => self
                .client
                .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
                .query(&[("key", self.api_key()?)])
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                })),
        };
        Ok(request)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .request(prompt)?
            .send()
            .await
            .context("completion request failed")?
            .error_for_status()
            .context("completion service returned an error status")?;
        let body = response.text().await.context("failed to read completion response")?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|error| MalformedReply(format!("invalid JSON: {error}")))?;

        extract_reply(self.provider, &json)
            .map(str::to_string)
            .ok_or_else(|| MalformedReply("reply text missing".to_string()).into())
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama => "http://localhost:11434",
        LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
    }
}

/// Resolve the chat completions endpoint from an OpenAI-compatible base URL.
fn openai_endpoint(base: &str) -> String {
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

fn extract_reply(provider: LlmProvider, json: &Value) -> Option<&str> {
    match provider {
        LlmProvider::OpenAi => json["choices"].get(0)?["message"]["content"].as_str(),
        LlmProvider::Anthropic => json["content"].get(0)?["text"].as_str(),
        LlmProvider::Ollama => json["response"].as_str(),
        LlmProvider::Gemini => {
            json["candidates"].get(0)?["content"]["parts"].get(0)?["text"].as_str()
        }
    }
}

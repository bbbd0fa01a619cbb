//! Groq LLM provider (OpenAI-compatible chat completions)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{LlmConfig, GROQ_API_KEY_ENV};
use crate::error::{Error, Result};

use super::llm::LlmProvider;
use super::retry_request;

/// Groq chat-completions client
pub struct GroqLlm {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GroqLlm {
    /// Create a client; fails when no API key was configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config(format!("{} is not set", GROQ_API_KEY_ENV))
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.groq_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.groq_model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

/// Turn a raw chat-completions reply into the answer text.
///
/// Client errors other than 429 come back as [`Error::LlmRejected`].
fn parse_completion(status: StatusCode, bytes: &[u8]) -> Result<String> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiErrorEnvelope>(bytes)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
        let message = format!("Groq API error {}: {}", status, message);
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::llm_rejected(message));
        }
        return Err(Error::llm(message));
    }

    let parsed: ChatCompletionResponse = serde_json::from_slice(bytes)
        .map_err(|e| Error::llm(format!("Failed to parse completion: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .ok_or_else(|| Error::llm("Completion contained no message content"))
}

#[async_trait]
impl LlmProvider for GroqLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = self.endpoint();
        let endpoint = endpoint.as_str();
        let request = self.build_request(prompt);
        let request = &request;

        tracing::info!("Generating answer with Groq model: {}", self.model);

        retry_request(self.max_retries, || async move {
            let response = self
                .http
                .post(endpoint)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Groq request failed: {}", e)))?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::llm(format!("Failed to read Groq response: {}", e)))?;

            parse_completion(status, &bytes)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        match self.http.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

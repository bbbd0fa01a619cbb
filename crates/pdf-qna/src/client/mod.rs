//! HTTP client for the question-answering server
//!
//! Every call returns the server's JSON payload. Transport failures and
//! non-JSON error replies are folded into `{"error": "..."}`, so callers only
//! ever inspect a payload.

pub mod chat;

pub use chat::{render_markdown, ChatMessage, ChatSession, Role};

use reqwest::{multipart, Client, Response};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::QueryRequest;

/// Default server address, matching the server's default bind
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Client for `/upload`, `/qna` and `/clear`
#[derive(Clone)]
pub struct QnaClient {
    http: Client,
    base_url: String,
}

impl QnaClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload the PDF at `path`
    pub async fn upload_file(&self, path: &Path) -> Value {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => return error_payload(format!("Failed to read {}: {}", path.display(), e)),
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let part = match multipart::Part::bytes(data)
            .file_name(filename)
            .mime_str("application/pdf")
        {
            Ok(part) => part,
            Err(e) => return error_payload(format!("Failed to build upload: {}", e)),
        };

        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await;

        into_payload(response).await
    }

    /// Ask a question about the uploaded document
    pub async fn ask(&self, query: &str) -> Value {
        let response = self
            .http
            .post(format!("{}/qna", self.base_url))
            .json(&QueryRequest::new(query))
            .send()
            .await;

        into_payload(response).await
    }

    /// Delete the server's index
    pub async fn clear(&self) -> Value {
        let response = self
            .http
            .get(format!("{}/clear", self.base_url))
            .send()
            .await;

        into_payload(response).await
    }
}

fn error_payload(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

async fn into_payload(response: reqwest::Result<Response>) -> Value {
    let response = match response {
        Ok(response) => response,
        Err(e) => return error_payload(format!("Request failed: {}", e)),
    };

    let status = response.status();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return error_payload(format!("Failed to read response: {}", e)),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) if value.is_object() => value,
        _ if !status.is_success() => error_payload(format!(
            "Server returned {}: {}",
            status,
            String::from_utf8_lossy(&bytes).trim()
        )),
        _ => error_payload(format!("Unexpected response from server ({})", status)),
    }
}

//! Interactive chat session on top of [`QnaClient`]

use console::style;
use serde_json::Value;
use std::path::Path;

use super::QnaClient;

/// Shown when a question is asked before any document was uploaded
pub const UPLOAD_FIRST_NOTICE: &str = "Please upload a PDF before asking questions.";

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Notices and errors produced by the session itself
    System,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Transcript plus the "a document is uploaded" flag
pub struct ChatSession {
    client: QnaClient,
    messages: Vec<ChatMessage>,
    uploaded: bool,
}

impl ChatSession {
    /// Start an empty session
    pub fn new(client: QnaClient) -> Self {
        Self {
            client,
            messages: Vec::new(),
            uploaded: false,
        }
    }

    /// Transcript so far
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a document was uploaded in this session
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Upload a PDF; the confirmation or error is returned and logged in the transcript
    pub async fn upload(&mut self, path: &Path) -> Result<String, String> {
        let payload = self.client.upload_file(path).await;
        let result = match payload_field(&payload, "filename") {
            Ok(message) => {
                self.uploaded = true;
                Ok(message)
            }
            Err(e) => Err(e),
        };
        self.push(Role::System, outcome_text(&result));
        result
    }

    /// Ask a question; refused locally until something was uploaded
    pub async fn ask(&mut self, query: &str) -> Result<String, String> {
        let query = query.trim();
        if query.is_empty() {
            return Err("Type a question first.".to_string());
        }
        if !self.uploaded {
            return Err(UPLOAD_FIRST_NOTICE.to_string());
        }

        self.push(Role::User, query.to_string());

        let payload = self.client.ask(query).await;
        let result = payload_field(&payload, "response");
        match &result {
            Ok(answer) => self.push(Role::Assistant, answer.clone()),
            Err(e) => self.push(Role::System, e.clone()),
        }
        result
    }

    /// Clear the server index and start a fresh transcript
    pub async fn clear(&mut self) -> Result<String, String> {
        let payload = self.client.clear().await;
        let result = payload_field(&payload, "message");
        if result.is_ok() {
            self.uploaded = false;
            self.messages.clear();
        }
        result
    }

    fn push(&mut self, role: Role, content: String) {
        self.messages.push(ChatMessage { role, content });
    }
}

/// Pull a success field out of a payload, or its error message
fn payload_field(payload: &Value, field: &str) -> Result<String, String> {
    if let Some(error) = payload.get("error") {
        return Err(error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()));
    }
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("Response had no '{}' field: {}", field, payload))
}

fn outcome_text(result: &Result<String, String>) -> String {
    match result {
        Ok(message) | Err(message) => message.clone(),
    }
}

/// Render assistant text for the terminal, setting fenced code blocks apart
pub fn render_markdown(text: &str) -> String {
    let mut out = Vec::new();
    let mut in_code = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(lang) = trimmed.strip_prefix("```") {
            if in_code {
                out.push(style("  └────").dim().to_string());
            } else {
                let lang = lang.trim();
                let header = if lang.is_empty() {
                    "  ┌────".to_string()
                } else {
                    format!("  ┌──── {}", lang)
                };
                out.push(style(header).dim().to_string());
            }
            in_code = !in_code;
            continue;
        }

        if in_code {
            out.push(format!("  {} {}", style("│").dim(), style(line).cyan()));
        } else {
            out.push(line.to_string());
        }
    }

    // Unterminated fence
    if in_code {
        out.push(style("  └────").dim().to_string());
    }

    out.join("\n")
}

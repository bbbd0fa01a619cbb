//! Response bodies for the HTTP endpoints

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Confirmation message naming the uploaded file
    pub filename: String,
}

impl UploadResponse {
    /// Confirmation for `filename`
    pub fn uploaded(filename: &str) -> Self {
        Self {
            filename: format!("File uploaded successfully: {}", filename),
        }
    }
}

/// Body of a successful `POST /qna`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub response: String,
}

/// Body of a successful `GET /clear`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Confirmation message
    pub message: String,
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self {
            message: "Cleared successfully".to_string(),
        }
    }
}

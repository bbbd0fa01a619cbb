//! Error types for the question-answering service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
///
/// Every endpoint reports failures through this enum, so the mapping to a
/// status code and an `{"error": ..}` payload lives in one place.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request (missing field, empty query, bad multipart)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Persisting the uploaded file failed
    #[error("Error occurred during file upload: {0}")]
    Upload(String),

    /// Parsing, chunking, embedding or index building failed
    #[error("Error occurred during file processing: {0}")]
    Processing(String),

    /// A query arrived before any document was indexed
    #[error("Error occurred during handling user query: no document has been indexed yet, upload a PDF first")]
    IndexNotFound,

    /// The persisted index could not be read
    #[error("Error occurred during handling user query: failed to load index: {0}")]
    IndexLoad(String),

    /// Embedding or LLM call failed while answering a query
    #[error("Error occurred during handling user query: {0}")]
    Generation(String),

    /// Removing or recreating the index directory failed
    #[error("Error occurred during clearing: {0}")]
    Clear(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM provider rejected the request (4xx other than 429); not retried
    #[error("LLM error: {0}")]
    LlmRejected(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a processing error
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a non-retryable LLM error
    pub fn llm_rejected(message: impl Into<String>) -> Self {
        Self::LlmRejected(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether repeating the request that failed with this error may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::LlmRejected(_))
    }

    /// Re-tag a failure raised inside the ingestion pipeline.
    ///
    /// Anything that already carries an upload or processing tag is kept,
    /// everything else counts as a processing failure.
    pub fn into_processing(self) -> Self {
        match self {
            Error::Upload(_) | Error::Processing(_) | Error::BadRequest(_) => self,
            other => Error::Processing(other.to_string()),
        }
    }

    /// Re-tag a failure raised while answering a query.
    pub fn into_generation(self) -> Self {
        match self {
            Error::IndexNotFound
            | Error::IndexLoad(_)
            | Error::Generation(_)
            | Error::BadRequest(_) => self,
            Error::Embedding(msg) | Error::Llm(msg) | Error::LlmRejected(msg) => {
                Error::Generation(msg)
            }
            other => Error::Generation(other.to_string()),
        }
    }

    /// Machine-readable kind and HTTP status for this error
    pub fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Upload(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upload_error"),
            Error::Processing(_) => (StatusCode::BAD_REQUEST, "processing_error"),
            Error::IndexNotFound => (StatusCode::CONFLICT, "index_not_found"),
            Error::IndexLoad(_) => (StatusCode::INTERNAL_SERVER_ERROR, "index_load_error"),
            Error::Generation(_) => (StatusCode::BAD_GATEWAY, "generation_error"),
            Error::Clear(_) => (StatusCode::INTERNAL_SERVER_ERROR, "clear_error"),
            Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            Error::Llm(_) | Error::LlmRejected(_) => (StatusCode::BAD_GATEWAY, "llm_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, kind) = self.kind();

        if status.is_server_error() {
            tracing::error!(kind, "{}", self);
        } else {
            tracing::warn!(kind, "{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::processing("bad pdf").kind().0, StatusCode::BAD_REQUEST);
        assert_eq!(Error::Upload("disk full".into()).kind().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::IndexNotFound.kind(), (StatusCode::CONFLICT, "index_not_found"));
        assert_eq!(Error::Clear("gone".into()).kind().1, "clear_error");
    }

    #[test]
    fn test_retagging() {
        let err = Error::embedding("connection refused").into_processing();
        assert!(matches!(err, Error::Processing(_)));

        let err = Error::llm("503").into_generation();
        assert!(matches!(err, Error::Generation(ref m) if m == "503"));

        let err = Error::IndexNotFound.into_generation();
        assert!(matches!(err, Error::IndexNotFound));

        let err = Error::llm_rejected("401").into_generation();
        assert!(matches!(err, Error::Generation(ref m) if m == "401"));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::llm("503").is_retryable());
        assert!(Error::embedding("connection refused").is_retryable());
        assert!(!Error::llm_rejected("401").is_retryable());
    }

    #[tokio::test]
    async fn test_error_payload_shape() {
        let response = Error::processing("not a PDF").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "processing_error");
        assert_eq!(
            body["error"],
            "Error occurred during file processing: not a PDF"
        );
    }
}

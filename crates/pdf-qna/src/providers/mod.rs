//! Provider abstractions for embeddings and answer generation
//!
//! The pipeline only talks to the traits, so the embedding model and the LLM
//! backend can be swapped through configuration (or mocked in tests).

pub mod embedding;
pub mod groq;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use groq::GroqLlm;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Retry an outbound request with exponential backoff (1s, 2s, 4s, ...).
///
/// Errors that are not [`Error::is_retryable`] are returned at once.
pub(crate) async fn retry_request<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::internal("retry loop ended without a result")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_request(2, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Error::llm("busy"))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_request(1, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::llm("down"))
        })
        .await;

        assert!(matches!(result, Err(Error::Llm(ref m)) if m == "down"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_request_is_not_retried() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result: Result<()> = retry_request(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::llm_rejected("401 Unauthorized"))
        })
        .await;

        assert!(matches!(result, Err(Error::LlmRejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }
}

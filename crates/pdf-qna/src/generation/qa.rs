//! Retrieval-augmented answering over the live index

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::VectorIndex;

use super::prompt::PromptBuilder;

/// Embeds the question, retrieves the closest chunks and asks the LLM
pub struct RetrievalQa {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl RetrievalQa {
    /// Create a QA chain retrieving `top_k` chunks per question
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            top_k: top_k.max(1),
        }
    }

    /// Answer `question` from `index`
    pub async fn answer(&self, index: &VectorIndex, question: &str) -> Result<String> {
        let start = Instant::now();

        let query_embedding = self.embedder.embed(question).await?;
        let results = index.search(&query_embedding, self.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks (best similarity {:.3})",
            results.len(),
            results.first().map(|r| r.similarity).unwrap_or(0.0)
        );

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        let answer = self.llm.generate(&prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::llm(format!("{} returned an empty answer", self.llm.name())));
        }

        tracing::info!(
            "Answered with {}/{} in {:?}",
            self.llm.name(),
            self.llm.model(),
            start.elapsed()
        );

        Ok(answer.to_string())
    }
}

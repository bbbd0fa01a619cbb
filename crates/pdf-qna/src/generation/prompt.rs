//! Prompt templates for grounded answering

use crate::retrieval::SearchResult;

/// Prompt builder for retrieval-augmented queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunk texts, best match first
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the grounding prompt sent to the LLM
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Based on the context provided, give a detailed and accurate answer to the question below.
Make sure your response is strictly derived from the context.

Context:
{context}

Question:
{input}

Answer:"#,
            context = context,
            input = question
        )
    }
}

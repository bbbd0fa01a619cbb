//! Upload-to-index pipeline: parse, chunk, embed, build

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::VectorIndex;
use crate::types::IndexManifest;

use super::chunker::TextChunker;
use super::parser::FileParser;

/// Turns an uploaded PDF into a searchable index
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestPipeline {
    /// Create a pipeline with the given chunker and embedder
    pub fn new(chunker: TextChunker, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { chunker, embedder }
    }

    /// Build an index from the PDF stored at `path`.
    ///
    /// The index is returned, not installed; the caller decides when it
    /// replaces the live one.
    pub async fn run(&self, filename: &str, path: &Path) -> Result<VectorIndex> {
        let start = Instant::now();
        let data = tokio::fs::read(path).await?;

        let name = filename.to_string();
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse_pdf(&name, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        tracing::info!(
            "Parsed '{}': {} pages, {} with text",
            filename,
            parsed.total_pages,
            parsed.pages.len()
        );

        let chunks = self.chunker.chunk_document(&parsed);
        if chunks.is_empty() {
            return Err(Error::processing(format!(
                "No text chunks could be produced from '{}'",
                filename
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let chunks = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| chunk.with_embedding(embedding))
            .collect();

        let manifest = IndexManifest {
            source_filename: filename.to_string(),
            chunk_count: 0,
            embedding_model: self.embedder.model().to_string(),
            dimensions: self.embedder.dimensions(),
            created_at: Utc::now(),
        };

        let index = VectorIndex::build(chunks, manifest)?;

        tracing::info!(
            "Indexed '{}': {} chunks in {:?}",
            filename,
            index.len(),
            start.elapsed()
        );

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_pdf, KeywordEmbedder};

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(TextChunker::new(1000, 20), Arc::new(KeywordEmbedder))
    }

    #[tokio::test]
    async fn test_builds_index_from_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(
            &path,
            sample_pdf(&["Transformers rely on attention.", "Cats sleep most of the day."]),
        )
        .unwrap();

        let index = pipeline().run("paper.pdf", &path).await.unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.manifest().source_filename, "paper.pdf");
        assert_eq!(index.manifest().embedding_model, "keyword-bag");
        assert_eq!(index.manifest().chunk_count, 2);
    }

    #[tokio::test]
    async fn test_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"plain text pretending to be a pdf").unwrap();

        let err = pipeline().run("notes.pdf", &path).await.unwrap_err();
        assert!(matches!(err, Error::Processing(_)));
    }
}

//! Flat cosine-similarity index over chunk embeddings

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Chunk, IndexManifest};

/// Serialized index file inside an index directory
pub const INDEX_FILE: &str = "index.bin";

/// Manifest file written next to the index
pub const MANIFEST_FILE: &str = "manifest.json";

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

/// In-memory index; embeddings are stored L2-normalized so a dot product
/// is the cosine similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    manifest: IndexManifest,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Build an index from embedded chunks
    pub fn build(chunks: Vec<Chunk>, mut manifest: IndexManifest) -> Result<Self> {
        let dimensions = chunks
            .first()
            .map(|c| c.embedding.len())
            .ok_or_else(|| Error::processing("Cannot build an index from zero chunks"))?;

        if dimensions == 0 {
            return Err(Error::processing("Chunks have no embeddings"));
        }

        let mut normalized = Vec::with_capacity(chunks.len());
        for mut chunk in chunks {
            if chunk.embedding.len() != dimensions {
                return Err(Error::processing(format!(
                    "Chunk {} has {} dimensions, expected {}",
                    chunk.chunk_index,
                    chunk.embedding.len(),
                    dimensions
                )));
            }
            if !normalize(&mut chunk.embedding) {
                return Err(Error::processing(format!(
                    "Chunk {} has a zero-length embedding",
                    chunk.chunk_index
                )));
            }
            normalized.push(chunk);
        }

        manifest.chunk_count = normalized.len();
        manifest.dimensions = dimensions;

        Ok(Self {
            manifest,
            dimensions,
            chunks: normalized,
        })
    }

    /// Top-k chunks by cosine similarity, best first
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if query_embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let mut query = query_embedding.to_vec();
        if !normalize(&mut query) {
            return Err(Error::embedding("Query embedding is all zeros"));
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, dot(&query, &chunk.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect())
    }

    /// Write `index.bin` and `manifest.json` into `dir` (created if needed)
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::internal(format!("Failed to serialize index: {}", e)))?;
        std::fs::write(dir.join(INDEX_FILE), bytes)?;

        let manifest = serde_json::to_string_pretty(&self.manifest)?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest)?;

        Ok(())
    }

    /// Read an index previously written by [`VectorIndex::save`]
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let bytes = std::fs::read(&path)
            .map_err(|e| Error::IndexLoad(format!("{}: {}", path.display(), e)))?;

        let (index, _): (Self, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| Error::IndexLoad(format!("{}: {}", path.display(), e)))?;

        Ok(index)
    }

    /// Index metadata
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale to unit length; false for a zero vector
fn normalize(v: &mut [f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

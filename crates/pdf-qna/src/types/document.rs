//! Chunk and index metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of extracted document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Position of the chunk within the document (0-based)
    pub chunk_index: u32,
    /// Text content
    pub content: String,
    /// Page the chunk was taken from (1-based)
    pub page_number: u32,
    /// Embedding vector (empty until embedded)
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(content: String, page_number: u32, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk_index,
            content,
            page_number,
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Human-readable description of the persisted index, written next to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Filename of the document the index was built from
    pub source_filename: String,
    /// Number of chunks in the index
    pub chunk_count: usize,
    /// Embedding model used
    pub embedding_model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// When the index was built
    pub created_at: DateTime<Utc>,
}

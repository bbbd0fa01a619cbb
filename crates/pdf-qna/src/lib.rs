//! pdf-qna: question answering over a single uploaded PDF
//!
//! An upload is parsed, split into overlapping chunks, embedded and stored as
//! the one persisted vector index. Questions are answered by retrieving the
//! closest chunks and passing them to an LLM inside a grounding prompt.
//! `client` holds the HTTP client and chat session used by `pdf-qna-chat`.

pub mod client;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ChatSession, QnaClient};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::RagServer;
pub use types::{
    document::{Chunk, IndexManifest},
    query::QueryRequest,
    response::{ClearResponse, QueryResponse, UploadResponse},
};

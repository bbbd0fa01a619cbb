//! Fixtures shared by unit tests: in-memory PDFs and offline providers

use async_trait::async_trait;
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::Arc;

use crate::config::{RagConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::server::{state::AppState, RagServer};
use crate::types::{Chunk, IndexManifest};

/// Build a PDF with one page of Courier text per entry
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Chunk with a given embedding
pub(crate) fn chunk(content: &str, embedding: Vec<f32>) -> Chunk {
    Chunk::new(content.to_string(), 1, 0).with_embedding(embedding)
}

/// Manifest for `filename`; counts are filled in by `VectorIndex::build`
pub(crate) fn manifest(filename: &str) -> IndexManifest {
    IndexManifest {
        source_filename: filename.to_string(),
        chunk_count: 0,
        embedding_model: "keyword-bag".to_string(),
        dimensions: 0,
        created_at: Utc::now(),
    }
}

const KEYWORDS: &[&str] = &["attention", "transformer", "cat", "dog", "sleep", "bark"];

/// Counts a fixed keyword list plus a constant bias term, so every text
/// gets a non-zero vector and shared keywords dominate similarity
pub(crate) struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut embedding: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        embedding.push(0.1);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }

    fn model(&self) -> &str {
        "keyword-bag"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Answers with the prompt it was given
pub(crate) struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

/// Always fails like an unreachable backend
pub(crate) struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::llm("backend unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "none"
    }
}

/// Serve `router` on an ephemeral port and return its base URL
pub(crate) async fn spawn(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Full service with offline providers, data kept under `dir`
pub(crate) async fn spawn_service(dir: &std::path::Path) -> String {
    let config = RagConfig {
        storage: StorageConfig::under(dir.to_path_buf()),
        ..RagConfig::default()
    };
    let state = AppState::with_providers(config, Arc::new(KeywordEmbedder), Arc::new(EchoLlm))
        .await
        .unwrap();
    spawn(RagServer::with_state(state).build_router()).await
}

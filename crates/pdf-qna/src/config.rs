//! Configuration for the question-answering service
//!
//! Values come from the `Default` impls, then an optional TOML file, then
//! environment overrides. The LLM credential is only ever read from the
//! environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the Groq API key
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable pointing at a TOML config file
pub const CONFIG_PATH_ENV: &str = "PDF_QNA_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Working directories
    pub storage: StorageConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration: defaults, then `path` (or `PDF_QNA_CONFIG`), then env
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDF_QNA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PDF_QNA_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = lookup("PDF_QNA_DATA_DIR") {
            self.storage = StorageConfig::under(PathBuf::from(dir));
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.embeddings.base_url = url.clone();
            self.llm.ollama_base_url = url;
        }
        if let Some(backend) = lookup("PDF_QNA_LLM_BACKEND") {
            match backend.to_lowercase().as_str() {
                "groq" => self.llm.backend = LlmBackend::Groq,
                "ollama" => self.llm.backend = LlmBackend::Ollama,
                other => tracing::warn!("Ignoring unknown PDF_QNA_LLM_BACKEND '{}'", other),
            }
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            self.llm.groq_model = model;
        }
        if let Some(url) = lookup("GROQ_BASE_URL") {
            self.llm.groq_base_url = url;
        }
        if let Some(key) = lookup(GROQ_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
    }

    /// Check the configuration before the server starts
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.llm.backend == LlmBackend::Groq && self.llm.api_key.is_none() {
            return Err(Error::Config(format!(
                "the groq backend needs an API key: set {}",
                GROQ_API_KEY_ENV
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Working directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Transient uploads land here and are removed after indexing
    pub upload_dir: PathBuf,
    /// Holds the single persisted index
    pub index_dir: PathBuf,
}

impl StorageConfig {
    /// Both directories beneath one data directory
    pub fn under(data_dir: PathBuf) -> Self {
        Self {
            upload_dir: data_dir.join("uploads"),
            index_dir: data_dir.join("index"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdf-qna");
        Self::under(data_dir)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 20,
        }
    }
}

/// Embedding configuration (Ollama)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (384 for bge-small / all-minilm, 768 for nomic)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Which service generates answers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Groq hosted models through the OpenAI-compatible API
    #[default]
    Groq,
    /// Local Ollama server
    Ollama,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend selection
    pub backend: LlmBackend,
    /// Groq API key, only ever taken from `GROQ_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Groq OpenAI-compatible base URL
    pub groq_base_url: String,
    /// Groq model name
    pub groq_model: String,
    /// Ollama base URL
    pub ollama_base_url: String,
    /// Ollama generation model
    pub ollama_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Groq,
            api_key: None,
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_model: "llama3-70b-8192".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the LLM
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_chunking_and_retrieval() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_groq_requires_api_key() {
        let config = RagConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains(GROQ_API_KEY_ENV)));

        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[(GROQ_API_KEY_ENV, "test-key")]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_backend_needs_no_key() {
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[("PDF_QNA_LLM_BACKEND", "ollama")]));
        assert_eq!(config.llm.backend, LlmBackend::Ollama);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[
            ("PDF_QNA_PORT", "9000"),
            ("PDF_QNA_DATA_DIR", "/tmp/qna"),
            ("OLLAMA_BASE_URL", "http://ollama:11434"),
        ]));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.index_dir, PathBuf::from("/tmp/qna/index"));
        assert_eq!(config.storage.upload_dir, PathBuf::from("/tmp/qna/uploads"));
        assert_eq!(config.embeddings.base_url, "http://ollama:11434");
        assert_eq!(config.llm.ollama_base_url, "http://ollama:11434");
    }

    #[test]
    fn test_toml_partial_sections() {
        let config = RagConfig::from_toml(
            r#"
            [server]
            port = 8123

            [chunking]
            chunk_size = 500
            chunk_overlap = 50

            [llm]
            backend = "ollama"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.llm.backend, LlmBackend::Ollama);
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_api_key_never_read_from_file() {
        let config = RagConfig::from_toml(
            r#"
            [llm]
            api_key = "from-file"
            "#,
        )
        .unwrap();
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = RagConfig::default();
        config.llm.backend = LlmBackend::Ollama;
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }
}

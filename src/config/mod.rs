//! Configuration management for docqa
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Which vector index backend holds the embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendKind {
    /// Exact nearest-neighbour index kept in-process and persisted to disk
    Flat,
    /// External Qdrant collection
    Qdrant,
}

impl std::fmt::Display for VectorBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorBackendKind::Flat => write!(f, "flat"),
            VectorBackendKind::Qdrant => write!(f, "qdrant"),
        }
    }
}

/// Where original uploads are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Local,
    Disabled,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vector index backend
    #[serde(default = "default_vector_db")]
    pub vector_db: VectorBackendKind,

    /// Directory of the flat index (relative paths resolve against the base dir)
    #[serde(default = "default_vector_db_path")]
    pub vector_db_path: String,

    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding API configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Completion API configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Upload validation
    #[serde(default)]
    pub upload: UploadConfig,

    /// Query defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Blob storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log files
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_embedding_url")]
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Get the API key from environment
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

/// Completion (answer generation) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_completion_url")]
    pub base_url: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_completion_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl CompletionConfig {
    /// Get the API key from environment
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

fn read_api_key(env_name: &str) -> Option<String> {
    if env_name.is_empty() {
        return None;
    }
    std::env::var(env_name).ok().filter(|k| !k.is_empty())
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Tokens per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tokens shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

/// Upload validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum file size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Accepted extensions, lower-case with leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of chunks retrieved
    #[serde(default = "default_query_top_k")]
    pub top_k: usize,

    /// Minimum similarity score (0.0 - 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Default answer length limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackendKind,

    /// Root directory for the local backend (relative paths resolve against the base dir)
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

/// Log file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for app.log / error.log; console only when unset
    #[serde(default)]
    pub dir: Option<String>,

    /// Write log files as JSON lines
    #[serde(default)]
    pub json: bool,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for docqa data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_db: default_vector_db(),
            vector_db_path: default_vector_db_path(),
            qdrant_url: default_qdrant_url(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            chunk: ChunkConfig::default(),
            upload: UploadConfig::default(),
            query: QueryConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: default_embedding_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            base_url: default_completion_url(),
            api_key_env: default_api_key_env(),
            temperature: default_completion_temperature(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_query_top_k(),
            similarity_threshold: default_similarity_threshold(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Get the default base directory for docqa (~/.docqa)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docqa")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("metadata.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("metadata.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Directory holding the flat index files
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.vector_db_path)
    }

    /// Root directory of the local blob store
    pub fn storage_dir(&self) -> PathBuf {
        self.resolve(&self.storage.dir)
    }

    /// Directory for log files, if file logging is enabled
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.dir.as_deref().map(|d| self.resolve(d))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.paths.base_dir.join(p)
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(Error::Config("chunk.chunk_size must be positive".to_string()));
        }

        if self.chunk.overlap >= self.chunk.chunk_size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.chunk_size".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if let Some(expected) = embedding_dimension_for_model(&self.embedding.model) {
            if expected != self.embedding.dimension {
                return Err(Error::Config(format!(
                    "embedding.dimension is {} but model '{}' produces {}",
                    self.embedding.dimension, self.embedding.model, expected
                )));
            }
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        if self.query.top_k == 0 {
            return Err(Error::Config("query.top_k must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.query.similarity_threshold) {
            return Err(Error::Config(
                "query.similarity_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config(
                "completion.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }

        if let Some(bad) = self
            .upload
            .allowed_extensions
            .iter()
            .find(|e| !e.starts_with('.') || e.to_lowercase() != **e)
        {
            return Err(Error::Config(format!(
                "upload.allowed_extensions entry '{}' must be lower-case and start with '.'",
                bad
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.vector_db, VectorBackendKind::Flat);
        assert_eq!(config.collection_name, "document_chunks");
        assert_eq!(config.chunk.chunk_size, 400);
        assert_eq!(config.chunk.overlap, 50);
        assert_eq!(config.query.top_k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.collection_name = "test_collection".to_string();
        config.vector_db = VectorBackendKind::Qdrant;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load(&config.paths.config_file).unwrap();
        assert_eq!(loaded.collection_name, "test_collection");
        assert_eq!(loaded.paths.base_dir, tmp.path());
        assert_eq!(loaded.vector_db, VectorBackendKind::Qdrant);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            vector_db = "qdrant"

            [query]
            top_k = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.vector_db, VectorBackendKind::Qdrant);
        assert_eq!(config.query.top_k, 7);
        assert_eq!(config.query.similarity_threshold, 0.5);
        assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // overlap >= chunk_size would never advance the window
        config.chunk.overlap = config.chunk.chunk_size;
        assert!(config.validate().is_err());

        config.chunk.overlap = 10;
        assert!(config.validate().is_ok());

        config.query.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
        config.query.similarity_threshold = 0.5;

        config.query.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dimension_must_match_known_model() {
        let mut config = Config::default();
        config.embedding.model = "text-embedding-3-large".to_string();
        assert!(config.validate().is_err());

        config.embedding.dimension = 3072;
        assert!(config.validate().is_ok());

        config.embedding.model = "custom-model".to_string();
        config.embedding.dimension = 512;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension_validation() {
        let mut config = Config::default();
        config.upload.allowed_extensions = vec!["PDF".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let mut config = Config::default();
        config.init_paths(Some(PathBuf::from("/srv/docqa")));
        assert_eq!(config.index_dir(), PathBuf::from("/srv/docqa/vectordb"));
        assert_eq!(config.storage_dir(), PathBuf::from("/srv/docqa/blobs"));
        assert!(config.log_dir().is_none());

        config.vector_db_path = "/var/lib/index".to_string();
        assert_eq!(config.index_dir(), PathBuf::from("/var/lib/index"));
    }
}

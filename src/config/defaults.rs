//! Default values for configuration

use super::{StorageBackendKind, VectorBackendKind};

/// Default vector backend (in-process flat index)
pub fn default_vector_db() -> VectorBackendKind {
    VectorBackendKind::Flat
}

/// Default directory name for the flat index, relative to the base dir
pub fn default_vector_db_path() -> String {
    "vectordb".to_string()
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "document_chunks".to_string()
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Dimension of text-embedding-3-small
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default embedding API base URL
pub fn default_embedding_url() -> String {
    std::env::var("DOCQA_EMBEDDING_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1/".to_string())
}

/// Default environment variable holding the API key
pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    64
}

/// Default request timeout for remote APIs, in seconds
pub fn default_request_timeout() -> u64 {
    60
}

/// Default completion model
pub fn default_completion_model() -> String {
    "o4-mini".to_string()
}

/// Default completion API base URL
pub fn default_completion_url() -> String {
    std::env::var("DOCQA_COMPLETION_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1/".to_string())
}

/// Default sampling temperature for answers
pub fn default_completion_temperature() -> f32 {
    0.2
}

/// Default chunk size in tokens
pub fn default_chunk_size() -> usize {
    400
}

/// Default overlap between consecutive chunks in tokens
pub fn default_chunk_overlap() -> usize {
    50
}

/// Default maximum upload size (10 MB)
pub fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

/// Default allowed upload extensions
pub fn default_allowed_extensions() -> Vec<String> {
    vec![".pdf".to_string(), ".docx".to_string(), ".txt".to_string()]
}

/// Default number of chunks passed to the answerer
pub fn default_query_top_k() -> usize {
    3
}

/// Default minimum similarity score
pub fn default_similarity_threshold() -> f32 {
    0.5
}

/// Default answer length limit in tokens
pub fn default_max_tokens() -> u32 {
    1000
}

/// Default blob storage backend
pub fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::Local
}

/// Default blob directory name, relative to the base dir
pub fn default_storage_dir() -> String {
    "blobs".to_string()
}

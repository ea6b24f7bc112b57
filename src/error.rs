//! Custom error types for docqa

use thiserror::Error;

/// Main error type for docqa operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Could not read document: {0}")]
    Extraction(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Vector index is unreadable at {path}: {reason}")]
    IndexCorrupt { path: String, reason: String },

    #[error("Unsupported file type '{extension}'. Supported types: {allowed}")]
    UnsupportedFileType { extension: String, allowed: String },

    #[error("File too large: {size} bytes (maximum {max_mb:.1} MB)")]
    FileTooLarge { size: usize, max_mb: f64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("No document has been uploaded")]
    NoActiveDocument,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// How an error should be reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was bad (validation)
    Client,
    /// The referenced document does not exist
    NotFound,
    /// A downstream service or local resource failed
    Server,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnsupportedFileType { .. }
            | Error::FileTooLarge { .. }
            | Error::InvalidRequest(_)
            | Error::Config(_)
            | Error::AlreadyInitialized(_) => ErrorClass::Client,
            Error::DocumentNotFound(_) | Error::NoActiveDocument => ErrorClass::NotFound,
            _ => ErrorClass::Server,
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.class() {
            ErrorClass::Client => 2,
            ErrorClass::NotFound => 3,
            ErrorClass::Server => 1,
        }
    }
}

/// Result type alias for docqa
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

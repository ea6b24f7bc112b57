//! Blob storage for original uploaded files
//!
//! Files are kept at `documents/{file_id}{ext}` where `ext` is the
//! extension exactly as uploaded.

use crate::config::{Config, StorageBackendKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// URL recorded when no blob backend is configured
pub const STORAGE_NOT_CONFIGURED: &str = "storage_not_configured";

/// Storage for original document bytes
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the file and return its URL
    async fn upload(&self, file_id: &str, bytes: &[u8], filename: &str) -> Result<String>;

    /// Remove the file stored for `file_id`
    async fn delete(&self, file_id: &str, filename: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Create the blob store selected by configuration
pub fn create_blob_store(config: &Config) -> Box<dyn BlobStore> {
    match config.storage.backend {
        StorageBackendKind::Local => Box::new(LocalBlobStore::new(config.storage_dir())),
        StorageBackendKind::Disabled => Box::new(DisabledBlobStore),
    }
}

/// Extension of `filename` as uploaded (case preserved), dot included
fn raw_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Relative blob path for a document
pub fn blob_path(file_id: &str, filename: &str) -> String {
    format!("documents/{}{}", file_id, raw_extension(filename))
}

/// MIME type recorded for a blob: PDF and DOCX keep theirs, everything else is text
pub fn content_type(filename: &str) -> String {
    let ext = raw_extension(filename).to_lowercase();
    match ext.as_str() {
        ".pdf" | ".docx" => mime_guess::from_ext(&ext[1..])
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
        _ => "text/plain".to_string(),
    }
}

/// Blobs as plain files under a root directory
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn full_path(&self, file_id: &str, filename: &str) -> PathBuf {
        self.root.join(blob_path(file_id, filename))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, file_id: &str, bytes: &[u8], filename: &str) -> Result<String> {
        let path = self.full_path(file_id, filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        let absolute = std::path::absolute(&path)?;
        let url = Url::from_file_path(&absolute).map_err(|_| {
            Error::Storage(format!("Cannot build a URL for {}", absolute.display()))
        })?;

        debug!(
            path = %path.display(),
            content_type = %content_type(filename),
            bytes = bytes.len(),
            "Stored blob"
        );
        Ok(url.to_string())
    }

    async fn delete(&self, file_id: &str, filename: &str) -> Result<()> {
        let path = self.full_path(file_id, filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Blob already absent");
                Ok(())
            }
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// No blob backend: uploads are skipped and recorded with a sentinel URL
pub struct DisabledBlobStore;

#[async_trait]
impl BlobStore for DisabledBlobStore {
    async fn upload(&self, file_id: &str, _bytes: &[u8], _filename: &str) -> Result<String> {
        warn!(file_id, "Blob storage is not configured; skipping upload");
        Ok(STORAGE_NOT_CONFIGURED.to_string())
    }

    async fn delete(&self, file_id: &str, _filename: &str) -> Result<()> {
        warn!(file_id, "Blob storage is not configured; skipping deletion");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

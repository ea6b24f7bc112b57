//! Upload command implementation

use crate::chunk::Chunk;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::extract::{file_extension, process_document, DocumentKind};
use crate::meta::FileRecord;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Result of an upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadStats {
    pub message: String,
    pub file_id: String,
    pub filename: String,
    pub file_size: usize,
    pub chunks: usize,
    pub file_url: String,
    /// Previous documents that were replaced
    pub replaced: Vec<String>,
    /// Remote cleanup failures that did not abort the upload
    pub warnings: Vec<String>,
}

/// Upload a file from disk
pub async fn cmd_upload_path(
    ctx: &AppContext,
    path: &Path,
    name: Option<String>,
) -> Result<UploadStats> {
    let filename = match name {
        Some(name) => name,
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidRequest(format!("Cannot derive a file name from {}", path.display()))
            })?,
    };

    let bytes = tokio::fs::read(path).await?;
    cmd_upload(ctx, bytes, &filename).await
}

/// Validate, replace the active document, then index and store the new one
pub async fn cmd_upload(ctx: &AppContext, bytes: Vec<u8>, filename: &str) -> Result<UploadStats> {
    let kind = DocumentKind::from_filename(filename, &ctx.config.upload.allowed_extensions)?;

    let max = ctx.config.upload.max_file_size;
    if bytes.len() > max {
        return Err(Error::FileTooLarge {
            size: bytes.len(),
            max_mb: max as f64 / (1024.0 * 1024.0),
        });
    }

    let mut warnings = Vec::new();
    let replaced = replace_existing(ctx, &mut warnings).await?;

    let mut record = FileRecord::new(
        filename.to_string(),
        bytes.len(),
        file_extension(filename),
        blake3::hash(&bytes).to_hex().to_string(),
    );
    let file_id = record.file_id.clone();

    info!(
        file_id = %file_id,
        filename,
        size = bytes.len(),
        chunk_size = ctx.chunker.chunk_size(),
        overlap = ctx.chunker.overlap(),
        "Processing document"
    );
    let (bytes, chunks) = extract_and_chunk(ctx, bytes, filename, kind).await?;
    let chunk_count = chunks.len();
    if chunk_count == 0 {
        warn!(filename, "Document contains no extractable text");
    }

    record.vector_id = ctx.index.add(&file_id, chunks).await?;

    record.file_url = match ctx.blobs.upload(&file_id, &bytes, filename).await {
        Ok(url) => url,
        Err(e) => {
            discard_vectors(ctx, &file_id).await;
            return Err(e);
        }
    };

    if let Err(e) = ctx.db.insert_file(&record).await {
        discard_vectors(ctx, &file_id).await;
        if let Err(blob_err) = ctx.blobs.delete(&file_id, filename).await {
            warn!(file_id = %file_id, "Failed to remove blob after database error: {}", blob_err);
        }
        return Err(e);
    }

    info!(file_id = %file_id, chunks = chunk_count, "Upload complete");

    Ok(UploadStats {
        message: "Upload successful".to_string(),
        file_id,
        filename: filename.to_string(),
        file_size: bytes.len(),
        chunks: chunk_count,
        file_url: record.file_url,
        replaced,
        warnings,
    })
}

/// Remove every existing document; remote failures become warnings
async fn replace_existing(ctx: &AppContext, warnings: &mut Vec<String>) -> Result<Vec<String>> {
    let existing = ctx.db.list_files().await?;
    let mut replaced = Vec::with_capacity(existing.len());

    for file in existing {
        info!(file_id = %file.file_id, filename = %file.filename, "Replacing previous document");

        if let Err(e) = ctx.blobs.delete(&file.file_id, &file.filename).await {
            let msg = format!("Could not delete stored file for {}: {}", file.file_id, e);
            warn!("{}", msg);
            warnings.push(msg);
        }

        if let Err(e) = ctx.index.delete(&file.file_id).await {
            let msg = format!("Could not delete vectors for {}: {}", file.file_id, e);
            warn!("{}", msg);
            warnings.push(msg);
        }

        ctx.db.delete_file(&file.file_id).await?;
        replaced.push(file.file_id);
    }

    Ok(replaced)
}

/// Extraction and tokenization are CPU-bound, so run them off the async workers
async fn extract_and_chunk(
    ctx: &AppContext,
    bytes: Vec<u8>,
    filename: &str,
    kind: DocumentKind,
) -> Result<(Vec<u8>, Vec<Chunk>)> {
    let chunker = ctx.chunker.clone();
    let name = filename.to_string();

    tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, Vec<Chunk>)> {
        let chunks = process_document(&bytes, &name, kind, &chunker)?;
        Ok((bytes, chunks))
    })
    .await
    .map_err(|e| Error::Extraction(format!("Task join error: {}", e)))?
}

async fn discard_vectors(ctx: &AppContext, file_id: &str) {
    if let Err(e) = ctx.index.delete(file_id).await {
        warn!(file_id, "Failed to remove vectors after upload error: {}", e);
    }
}

/// Print upload result to console
pub fn print_upload_stats(stats: &UploadStats) {
    println!("\n✓ {}", stats.message);
    println!("  File ID: {}", stats.file_id);
    println!("  File: {} ({} bytes)", stats.filename, stats.file_size);
    println!("  Chunks indexed: {}", stats.chunks);
    println!("  Stored at: {}", stats.file_url);

    if !stats.replaced.is_empty() {
        println!("  Replaced: {}", stats.replaced.join(", "));
    }

    for warning in &stats.warnings {
        println!("  ⚠ {}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{test_context, FailingBlobStore};
    use crate::error::ErrorClass;

    #[tokio::test]
    async fn test_upload_txt() {
        let (ctx, _tmp) = test_context().await;

        let stats = cmd_upload(&ctx, b"Rust ownership rules.".to_vec(), "notes.txt")
            .await
            .unwrap();

        assert_eq!(stats.chunks, 1);
        assert!(stats.warnings.is_empty());
        assert!(stats.replaced.is_empty());

        let record = ctx.db.get_file(&stats.file_id).await.unwrap().unwrap();
        assert_eq!(record.file_type, ".txt");
        assert_eq!(record.file_size, 21);
        assert_eq!(record.vector_id, stats.file_id);
        assert_eq!(
            record.content_hash,
            blake3::hash(b"Rust ownership rules.").to_hex().to_string()
        );
        assert_eq!(ctx.index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_extension_and_size() {
        let (mut ctx, _tmp) = test_context().await;

        let err = cmd_upload(&ctx, b"MZ".to_vec(), "setup.exe").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Client);

        ctx.config.upload.max_file_size = 4;
        let err = cmd_upload(&ctx, b"too long".to_vec(), "a.txt").await.unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size: 8, .. }));

        assert_eq!(ctx.db.count_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upload_replaces_previous_document() {
        let (ctx, _tmp) = test_context().await;

        let first = cmd_upload(&ctx, b"python basics".to_vec(), "first.txt")
            .await
            .unwrap();
        let second = cmd_upload(&ctx, b"rust basics".to_vec(), "second.TXT")
            .await
            .unwrap();

        assert_eq!(second.replaced, vec![first.file_id.clone()]);

        let files = ctx.db.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_id, second.file_id);
        assert_eq!(files[0].file_type, ".txt");

        let hits = ctx.index.search_text("python", None, 10, 0.0).await.unwrap();
        assert!(hits
            .iter()
            .all(|h| h.metadata.doc_id.as_deref() == Some(second.file_id.as_str())));
    }

    #[tokio::test]
    async fn test_blob_failure_during_replace_is_a_warning() {
        let (mut ctx, _tmp) = test_context().await;
        cmd_upload(&ctx, b"python".to_vec(), "a.txt").await.unwrap();

        ctx.blobs = Box::new(FailingBlobStore::deletes_fail());
        let stats = cmd_upload(&ctx, b"rust".to_vec(), "b.txt").await.unwrap();

        assert_eq!(stats.warnings.len(), 1);
        assert_eq!(ctx.db.count_files().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blob_upload_failure_rolls_back_vectors() {
        let (mut ctx, _tmp) = test_context().await;
        ctx.blobs = Box::new(FailingBlobStore::uploads_fail());

        let err = cmd_upload(&ctx, b"rust".to_vec(), "a.txt").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(ctx.index.len().await.unwrap(), 0);
        assert_eq!(ctx.db.count_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_document_stores_nothing() {
        let (ctx, _tmp) = test_context().await;

        let err = cmd_upload(&ctx, b"not a zip archive".to_vec(), "broken.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert_eq!(err.class(), ErrorClass::Server);
        assert_eq!(ctx.index.len().await.unwrap(), 0);
        assert_eq!(ctx.db.count_files().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_multi_chunk_upload_on_worker_pool() {
        let (ctx, _tmp) = test_context().await;
        let text = "rust ownership borrowing lifetimes ".repeat(400);

        let stats = cmd_upload(&ctx, text.clone().into_bytes(), "long.txt")
            .await
            .unwrap();
        assert!(stats.chunks > 1);
        assert_eq!(stats.file_size, text.len());
        assert_eq!(ctx.index.len().await.unwrap(), stats.chunks);
    }

    #[tokio::test]
    async fn test_upload_path_uses_file_name() {
        let (ctx, tmp) = test_context().await;
        let path = tmp.path().join("guide.txt");
        std::fs::write(&path, "go routines").unwrap();

        let stats = cmd_upload_path(&ctx, &path, None).await.unwrap();
        assert_eq!(stats.filename, "guide.txt");

        let stats = cmd_upload_path(&ctx, &path, Some("renamed.txt".to_string()))
            .await
            .unwrap();
        assert_eq!(stats.filename, "renamed.txt");
    }
}

//! Delete command implementation

use crate::context::AppContext;
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Result of a deletion
#[derive(Debug, Clone, Serialize)]
pub struct DeleteStats {
    pub message: String,
    pub file_id: String,
    pub filename: String,
    /// Whether the vector index held chunks for the document
    pub vectors_removed: bool,
}

/// Delete a document, or the active one when no id is given
///
/// The stored file goes first, then the vectors, then the record.
pub async fn cmd_delete(ctx: &AppContext, file_id: Option<&str>) -> Result<DeleteStats> {
    let record = match file_id {
        Some(id) => ctx
            .db
            .get_file(id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?,
        None => ctx
            .db
            .list_files()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoActiveDocument)?,
    };

    info!(file_id = %record.file_id, filename = %record.filename, "Deleting document");

    ctx.blobs.delete(&record.file_id, &record.filename).await?;

    let vectors_removed = ctx.index.delete(&record.file_id).await?;
    if !vectors_removed {
        warn!(file_id = %record.file_id, "No vectors were stored for this document");
    }

    ctx.db.delete_file(&record.file_id).await?;

    Ok(DeleteStats {
        message: "Deleted successfully".to_string(),
        file_id: record.file_id,
        filename: record.filename,
        vectors_removed,
    })
}

/// Print deletion result to console
pub fn print_delete_stats(stats: &DeleteStats) {
    println!("✓ {}: {} ({})", stats.message, stats.filename, stats.file_id);
}

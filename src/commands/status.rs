//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::index::{open_store, IndexInfo};
use crate::meta::MetaDb;
use serde::Serialize;
use tracing::{debug, info};

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub vector_backend: String,
    /// Present when the vector index could be opened
    pub index: Option<IndexInfo>,
    pub index_error: Option<String>,
    pub embedding_model: String,
    pub completion_model: String,
    pub storage_backend: String,
    pub document_count: i64,
}

/// Get system status
///
/// An unreachable or unreadable vector index is reported, not raised.
pub async fn cmd_status(config: &Config, db: &MetaDb) -> Result<StatusInfo> {
    info!("Getting status");

    let document_count = db.count_files().await?;

    let (index, index_error) = match open_store(config).await {
        Ok(store) => match store.len().await {
            Ok(entries) => (
                Some(IndexInfo {
                    backend: store.backend_name().to_string(),
                    location: store.location(),
                    dimension: store.dimension(),
                    entries,
                }),
                None,
            ),
            Err(e) => {
                debug!("Vector index count error: {:?}", e);
                (None, Some(e.to_string()))
            }
        },
        Err(e) => {
            debug!("Vector index open error: {:?}", e);
            (None, Some(e.to_string()))
        }
    };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        vector_backend: config.vector_db.to_string(),
        index,
        index_error,
        embedding_model: config.embedding.model.clone(),
        completion_model: config.completion.model.clone(),
        storage_backend: format!("{:?}", config.storage.backend).to_lowercase(),
        document_count,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 docqa Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nVector index ({}):", status.vector_backend);

    match (&status.index, &status.index_error) {
        (Some(index), _) => {
            println!("  Location: {}", index.location);
            println!("  Status: ✓ Ready");
            println!("  Dimension: {}", index.dimension);
            println!("  Entries: {}", index.entries);
        }
        (None, Some(err)) => println!("  Status: ✗ {}", err),
        (None, None) => println!("  Status: ✗ Unavailable"),
    }

    println!("\nEmbedding Model: {}", status.embedding_model);
    println!("Completion Model: {}", status.completion_model);
    println!("Blob Storage: {}", status.storage_backend);
    println!("\nDocuments: {}", status.document_count);
}

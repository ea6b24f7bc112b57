//! List command implementation

use crate::error::Result;
use crate::meta::MetaDb;
use serde::Serialize;

/// A document as shown to users
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub file_id: String,
    pub filename: String,
    pub upload_time: String,
    pub file_size: i64,
    pub file_type: String,
}

/// List uploaded documents, newest first
pub async fn cmd_list(db: &MetaDb) -> Result<Vec<DocumentSummary>> {
    let files = db.list_files().await?;
    Ok(files
        .into_iter()
        .map(|f| DocumentSummary {
            file_id: f.file_id,
            filename: f.filename,
            upload_time: f.upload_time,
            file_size: f.file_size,
            file_type: f.file_type,
        })
        .collect())
}

/// Print document list to console
pub fn print_documents(documents: &[DocumentSummary]) {
    println!("\n📄 Documents\n");

    if documents.is_empty() {
        println!("No documents uploaded. Use 'docqa upload <file>' to add one.");
        return;
    }

    for doc in documents {
        println!("• {} [{}]", doc.filename, doc.file_type);
        println!("  ID: {}", doc.file_id);
        println!("  Size: {} bytes", doc.file_size);
        println!("  Uploaded: {}", doc.upload_time);
    }
}

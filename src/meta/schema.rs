//! SQLite schema definition

/// SQL schema for the metadata database
pub const SCHEMA_SQL: &str = r#"
-- Files: one row per uploaded document
CREATE TABLE IF NOT EXISTS files (
    file_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    file_type TEXT NOT NULL,
    vector_id TEXT NOT NULL,
    file_url TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    upload_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_upload_time ON files(upload_time);
"#;

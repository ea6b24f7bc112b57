//! Metadata storage using SQLite
//!
//! One table, `files`, holds a row per uploaded document with its size,
//! type, vector id, blob URL and content hash.

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// An uploaded document
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: String,
    pub filename: String,
    pub file_size: i64,
    /// Lower-case extension including the dot
    pub file_type: String,
    pub vector_id: String,
    pub file_url: String,
    pub content_hash: String,
    /// RFC 3339, UTC
    pub upload_time: String,
}

impl FileRecord {
    /// New record with a fresh UUID v4 and the current time
    pub fn new(filename: String, file_size: usize, file_type: String, content_hash: String) -> Self {
        Self {
            file_id: Uuid::new_v4().to_string(),
            filename,
            file_size: file_size as i64,
            file_type,
            vector_id: String::new(),
            file_url: String::new(),
            content_hash,
            upload_time: Utc::now().to_rfc3339(),
        }
    }
}

/// Metadata database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the metadata database named in the config
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::new(&config.paths.db_file).await
    }

    /// Open (creating if needed) the database at `db_path` and apply the schema
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='files'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    /// Insert a new document record
    pub async fn insert_file(&self, file: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (file_id, filename, file_size, file_type, vector_id, file_url, content_hash, upload_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.file_id)
        .bind(&file.filename)
        .bind(file.file_size)
        .bind(&file.file_type)
        .bind(&file.vector_id)
        .bind(&file.file_url)
        .bind(&file.content_hash)
        .bind(&file.upload_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a document record by id
    pub async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE file_id = ?")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    /// All document records, newest first
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files ORDER BY upload_time DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    /// Delete a document record; returns whether a row existed
    pub async fn delete_file(&self, file_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE file_id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_files(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

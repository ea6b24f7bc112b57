//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// What `init` created
#[derive(Debug, Clone, Serialize)]
pub struct InitStats {
    pub config_path: PathBuf,
    pub db_path: PathBuf,
    pub index_dir: PathBuf,
    pub storage_dir: PathBuf,
}

/// Write a default configuration and create the database and data directories
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<InitStats> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    let config_path = config.paths.config_file.clone();
    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(config_path.display().to_string()));
    }

    config.validate()?;
    config.save()?;

    MetaDb::connect(&config).await?;
    info!("Created database at {:?}", config.paths.db_file);

    let index_dir = config.index_dir();
    let storage_dir = config.storage_dir();
    std::fs::create_dir_all(&index_dir)?;
    std::fs::create_dir_all(&storage_dir)?;

    Ok(InitStats {
        config_path,
        db_path: config.paths.db_file,
        index_dir,
        storage_dir,
    })
}

/// Print init result and next steps
pub fn print_init_stats(stats: &InitStats) {
    println!("\n✓ docqa initialized successfully!");
    println!("  Config: {}", stats.config_path.display());
    println!("  Database: {}", stats.db_path.display());
    println!("  Vector index: {}", stats.index_dir.display());
    println!("  Blob storage: {}", stats.storage_dir.display());
    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY (or edit the api_key_env entries in the config)");
    println!("  2. Upload a document: docqa upload ./handbook.pdf");
    println!("  3. Ask a question: docqa ask \"What is the refund policy?\"");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("docqa");

        let stats = cmd_init(Some(base.clone()), false).await.unwrap();
        assert!(stats.config_path.exists());
        assert!(stats.db_path.exists());
        assert!(stats.index_dir.is_dir());
        assert!(stats.storage_dir.is_dir());

        let loaded = Config::load(&stats.config_path).unwrap();
        assert_eq!(loaded.paths.base_dir, base);
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().to_path_buf();

        cmd_init(Some(base.clone()), false).await.unwrap();
        let err = cmd_init(Some(base.clone()), false).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        assert!(cmd_init(Some(base), true).await.is_ok());
    }
}

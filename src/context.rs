//! Everything a document command needs, opened once per invocation

use crate::answer::{Answerer, OpenAiAnswerer};
use crate::chunk::TokenChunker;
use crate::config::Config;
use crate::embed::{create_embedder, Embedder};
use crate::error::Result;
use crate::index::VectorIndex;
use crate::meta::MetaDb;
use crate::storage::{create_blob_store, BlobStore};
use std::sync::Arc;

pub struct AppContext {
    pub config: Config,
    pub db: MetaDb,
    pub index: VectorIndex,
    pub chunker: TokenChunker,
    pub blobs: Box<dyn BlobStore>,
    pub answerer: Box<dyn Answerer>,
}

impl AppContext {
    /// Open the database, vector index and remote clients described by `config`
    pub async fn open(config: Config) -> Result<Self> {
        let db = MetaDb::connect(&config).await?;
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
        let index = VectorIndex::open(&config, embedder).await?;
        let chunker = TokenChunker::from_config(&config.chunk)?;
        let blobs = create_blob_store(&config);
        let answerer = Box::new(OpenAiAnswerer::new(&config.completion)?);

        Ok(Self {
            config,
            db,
            index,
            chunker,
            blobs,
            answerer,
        })
    }
}

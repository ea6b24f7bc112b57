//! Vector index over document chunks
//!
//! Two interchangeable backends sit behind [`VectorStore`]:
//! - [`FlatIndex`]: exact squared-L2 scan, persisted as JSON, rebuilt on delete
//! - [`QdrantStore`]: a Qdrant collection using Euclidean distance
//!
//! [`VectorIndex`] owns the embedder and applies the similarity threshold,
//! so both backends rank and filter identically.

mod flat;
mod payload;
mod qdrant;

pub use flat::*;
pub use payload::*;
pub use qdrant::*;

use crate::chunk::{Chunk, ChunkMetadata};
use crate::config::{Config, VectorBackendKind};
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A stored chunk with its position in the ranking
#[derive(Debug, Clone)]
pub struct StoredHit {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// A search result that cleared the similarity threshold
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
    pub similarity: f32,
}

/// Backend statistics for status output
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub backend: String,
    pub location: String,
    pub dimension: usize,
    pub entries: usize,
}

/// Storage contract shared by the flat and Qdrant backends
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store chunks (with `doc_id` already injected) and their vectors
    async fn add(&self, doc_id: &str, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Remove every entry for `doc_id`; returns how many entries were removed
    async fn delete(&self, doc_id: &str) -> Result<usize>;

    /// Nearest entries first, at most `limit`, optionally restricted to one document
    async fn nearest(
        &self,
        query: &[f32],
        doc_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredHit>>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize>;

    /// Human-readable location (directory or URL + collection)
    fn location(&self) -> String;

    fn backend_name(&self) -> &'static str;

    fn dimension(&self) -> usize;
}

/// Convert a squared-L2 distance into a similarity in (0, 1]
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Open the vector store selected by `config.vector_db`
pub async fn open_store(config: &Config) -> Result<Box<dyn VectorStore>> {
    let dimension = config.embedding.dimension;
    let store: Box<dyn VectorStore> = match config.vector_db {
        VectorBackendKind::Flat => Box::new(FlatIndex::open(&config.index_dir(), dimension)?),
        VectorBackendKind::Qdrant => {
            let store = QdrantStore::new(&config.qdrant_url, &config.collection_name, dimension)?;
            store.ensure_collection().await?;
            Box::new(store)
        }
    };

    info!(
        backend = store.backend_name(),
        location = %store.location(),
        "Opened vector index"
    );

    Ok(store)
}

/// Embedding-aware front for a [`VectorStore`]
pub struct VectorIndex {
    store: Box<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(store: Box<dyn VectorStore>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            store,
            embedder,
            batch_size,
        }
    }

    /// Open the backend selected by configuration
    pub async fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = open_store(config).await?;
        Ok(Self::new(store, embedder, config.embedding.batch_size))
    }

    /// Embed and store a document's chunks; returns the vector id (the document id)
    pub async fn add(&self, doc_id: &str, chunks: Vec<Chunk>) -> Result<String> {
        if chunks.is_empty() {
            debug!(doc_id, "No chunks to index");
            return Ok(doc_id.to_string());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embed_in_batches(self.embedder.as_ref(), texts, self.batch_size).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }
        let dimension = self.store.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch: index expects {}, got {}",
                dimension,
                bad.len()
            )));
        }

        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .map(|mut c| {
                c.metadata.doc_id = Some(doc_id.to_string());
                c
            })
            .collect();

        let count = chunks.len();
        self.store.add(doc_id, chunks, vectors).await?;
        info!(doc_id, chunks = count, "Added document to vector index");

        Ok(doc_id.to_string())
    }

    /// Remove a document's chunks; returns whether anything matched
    pub async fn delete(&self, doc_id: &str) -> Result<bool> {
        let removed = self.store.delete(doc_id).await?;
        info!(doc_id, removed, "Deleted document from vector index");
        Ok(removed > 0)
    }

    /// Nearest chunks to `query`, keeping only those with similarity >= `threshold`
    pub async fn search(
        &self,
        query: &[f32],
        doc_id: Option<&str>,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.store.dimension() {
            return Err(Error::Embedding(format!(
                "Query dimension mismatch: index expects {}, got {}",
                self.store.dimension(),
                query.len()
            )));
        }

        debug!(?doc_id, top_k, threshold, "Searching vector index");
        let raw = self.store.nearest(query, doc_id, top_k).await?;

        let mut hits = Vec::with_capacity(raw.len());
        for (i, hit) in raw.into_iter().enumerate() {
            let score = similarity(hit.distance);
            debug!(rank = i, distance = hit.distance, similarity = score, "Raw hit");
            if score >= threshold {
                hits.push(SearchHit {
                    content: hit.content,
                    metadata: hit.metadata,
                    distance: hit.distance,
                    similarity: score,
                });
            }
        }

        debug!(returned = hits.len(), "Hits after threshold filtering");
        Ok(hits)
    }

    /// Embed a question and search with it
    pub async fn search_text(
        &self,
        question: &str,
        doc_id: Option<&str>,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let mut vectors = self.embedder.embed(vec![question.to_string()]).await?;
        let query = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Embedding API returned no vector".to_string()))?;
        self.search(&query, doc_id, top_k, threshold).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn info(&self) -> Result<IndexInfo> {
        Ok(IndexInfo {
            backend: self.store.backend_name().to_string(),
            location: self.store.location(),
            dimension: self.store.dimension(),
            entries: self.store.len().await?,
        })
    }
}

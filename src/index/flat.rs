//! Exact nearest-neighbour index kept in process
//!
//! Vectors live in one contiguous `f32` buffer; entry `i` owns
//! `vectors[i * dimension..(i + 1) * dimension]`. Offsets are append-only
//! and deletion rebuilds the buffer densely from the surviving entries.

use super::{squared_l2, StoredHit, VectorStore};
use crate::chunk::{Chunk, ChunkMetadata};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

const INDEX_FILE: &str = "flat_index.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FlatEntry {
    doc_id: String,
    content: String,
    metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FlatState {
    dimension: usize,
    vectors: Vec<f32>,
    entries: Vec<FlatEntry>,
}

impl FlatState {
    fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            entries: Vec::new(),
        }
    }

    fn vector(&self, offset: usize) -> &[f32] {
        &self.vectors[offset * self.dimension..(offset + 1) * self.dimension]
    }
}

/// Flat squared-L2 index persisted as JSON
pub struct FlatIndex {
    dir: PathBuf,
    dimension: usize,
    state: RwLock<FlatState>,
}

impl FlatIndex {
    /// Open the index stored in `dir`, or start an empty one
    ///
    /// A file that cannot be parsed, or that disagrees with `dimension`,
    /// is reported as [`Error::IndexCorrupt`].
    pub fn open(dir: &Path, dimension: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);

        let state = if path.exists() {
            let corrupt = |reason: String| Error::IndexCorrupt {
                path: path.display().to_string(),
                reason,
            };

            let raw = std::fs::read_to_string(&path).map_err(|e| corrupt(e.to_string()))?;
            let state: FlatState = serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

            if state.dimension != dimension {
                return Err(corrupt(format!(
                    "stored dimension {} does not match configured dimension {}",
                    state.dimension, dimension
                )));
            }
            if state.vectors.len() != state.entries.len() * dimension {
                return Err(corrupt(format!(
                    "{} vector values for {} entries",
                    state.vectors.len(),
                    state.entries.len()
                )));
            }

            debug!(entries = state.entries.len(), path = %path.display(), "Loaded flat index");
            state
        } else {
            FlatState::empty(dimension)
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            dimension,
            state: RwLock::new(state),
        })
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Write through a temporary file so a crash never leaves a half-written index
    ///
    /// Callers hold the write guard across the await so writes land in order.
    async fn persist(&self, state: &FlatState) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        let path = self.index_path();
        let tmp = self.dir.join(format!("{}.tmp", INDEX_FILE));

        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::write(&tmp, bytes)?;
            std::fs::rename(&tmp, &path)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("Task join error: {}", e))))?
    }
}

#[async_trait]
impl VectorStore for FlatIndex {
    async fn add(&self, doc_id: &str, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::Embedding(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                bad.len()
            )));
        }

        let mut state = self.state.write().await;
        let (vector_len, entry_len) = (state.vectors.len(), state.entries.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            state.vectors.extend_from_slice(&vector);
            state.entries.push(FlatEntry {
                doc_id: doc_id.to_string(),
                content: chunk.content,
                metadata: chunk.metadata,
            });
        }

        if let Err(e) = self.persist(&state).await {
            state.vectors.truncate(vector_len);
            state.entries.truncate(entry_len);
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<usize> {
        let mut state = self.state.write().await;

        let keep: Vec<usize> = (0..state.entries.len())
            .filter(|&i| state.entries[i].doc_id != doc_id)
            .collect();
        let removed = state.entries.len() - keep.len();
        if removed == 0 {
            return Ok(0);
        }

        let mut rebuilt = FlatState::empty(self.dimension);
        rebuilt.vectors.reserve(keep.len() * self.dimension);
        for &offset in &keep {
            rebuilt.vectors.extend_from_slice(state.vector(offset));
            rebuilt.entries.push(state.entries[offset].clone());
        }

        self.persist(&rebuilt).await?;
        *state = rebuilt;

        info!(doc_id, removed, remaining = keep.len(), "Rebuilt flat index");
        Ok(removed)
    }

    async fn nearest(
        &self,
        query: &[f32],
        doc_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredHit>> {
        let state = self.state.read().await;

        let mut scored: Vec<(f32, usize)> = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| doc_id.map_or(true, |id| e.doc_id == id))
            .map(|(i, _)| (squared_l2(query, state.vector(i)), i))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| {
                let entry = &state.entries[i];
                StoredHit {
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.read().await.entries.len())
    }

    fn location(&self) -> String {
        self.index_path().display().to_string()
    }

    fn backend_name(&self) -> &'static str {
        "flat"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

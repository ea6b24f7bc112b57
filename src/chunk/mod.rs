//! Token-window chunking
//!
//! This module splits extracted document text into overlapping windows:
//! - The text is tokenized once with a BPE vocabulary
//! - A window of `chunk_size` tokens slides forward by `chunk_size - overlap`
//! - Window edges move inward to the nearest character boundary, and each
//!   window is cut from the source text and tagged with its token span

mod tokenizer;

pub use tokenizer::*;

use crate::config::ChunkConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A token window cut from the source text
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// Source text covered by `token_start..token_end`
    pub text: String,

    /// Chunk index (0-based)
    pub index: usize,

    /// First token of the window
    pub token_start: usize,

    /// One past the last token of the window
    pub token_end: usize,
}

/// Metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,

    /// Position of the chunk within its document
    pub chunk: usize,

    pub source: String,

    /// Owning document, injected when the chunk is indexed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

/// A bounded span of document text with positional metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Sliding-window chunker over token ids
#[derive(Clone)]
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Create a chunker; rejects windows that would never advance
    pub fn new(tokenizer: Arc<dyn Tokenizer>, chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            tokenizer,
            chunk_size,
            overlap,
        })
    }

    /// Build from configuration with the default vocabulary
    pub fn from_config(config: &ChunkConfig) -> Result<Self> {
        Self::new(
            Arc::new(Cl100kTokenizer::new()?),
            config.chunk_size,
            config.overlap,
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping token windows
    ///
    /// Every window re-encodes to at most `chunk_size` tokens, unless a single
    /// character needs more tokens than that on its own.
    pub fn split(&self, text: &str) -> Result<Vec<TextChunk>> {
        let lengths = self.tokenizer.token_lengths(text);
        if lengths.is_empty() {
            return Ok(Vec::new());
        }

        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut total = 0;
        offsets.push(total);
        for len in &lengths {
            total += len;
            offsets.push(total);
        }
        let n = lengths.len();
        if offsets[n] != text.len() {
            return Err(Error::Chunking(format!(
                "{} tokenizer covers {} of {} bytes",
                self.tokenizer.name(),
                offsets[n],
                text.len()
            )));
        }

        let boundary = |i: usize| text.is_char_boundary(offsets[i]);
        let reencoded =
            |s: usize, e: usize| self.tokenizer.encode(&text[offsets[s]..offsets[e]]).len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let limit = std::cmp::min(start + self.chunk_size, n);
            let mut end = (start + 1..=limit)
                .rev()
                .find(|&i| boundary(i))
                .or_else(|| (limit + 1..=n).find(|&i| boundary(i)))
                .unwrap_or(n);

            // Text cut mid-run can tokenize differently than it did in place
            while reencoded(start, end) > self.chunk_size {
                match (start + 1..end).rev().find(|&i| boundary(i)) {
                    Some(shorter) => end = shorter,
                    None => break,
                }
            }

            chunks.push(TextChunk {
                text: text[offsets[start]..offsets[end]].to_string(),
                index: chunks.len(),
                token_start: start,
                token_end: end,
            });

            // A window that reached the end already covers the tail
            if end == n {
                break;
            }

            start = (start + 1..=end.saturating_sub(self.overlap))
                .rev()
                .find(|&i| boundary(i))
                .or_else(|| (start + 1..=end).find(|&i| boundary(i)))
                .unwrap_or(end);
        }

        debug!(
            tokens = n,
            chunks = chunks.len(),
            vocabulary = self.tokenizer.name(),
            "Split text into token windows"
        );

        Ok(chunks)
    }
}

/// Chunk a document's text and tag each window with the source filename
pub fn chunk_document(text: &str, filename: &str, chunker: &TokenChunker) -> Result<Vec<Chunk>> {
    let windows = chunker.split(text)?;

    Ok(windows
        .into_iter()
        .map(|w| Chunk {
            content: w.text,
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                chunk: w.index,
                source: filename.to_string(),
                doc_id: None,
            },
        })
        .collect())
}

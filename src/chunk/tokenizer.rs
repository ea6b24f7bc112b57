//! BPE tokenization used to measure chunk windows

use crate::error::{Error, Result};
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Text to token conversion
pub trait Tokenizer: Send + Sync {
    /// Encode text to token ids (special tokens are treated as plain text)
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Byte length of each token of `text`, in order; the lengths sum to `text.len()`
    ///
    /// A token may end inside a multi-byte character.
    fn token_lengths(&self, text: &str) -> Vec<usize>;

    /// Vocabulary name, for logs
    fn name(&self) -> &str;
}

/// OpenAI `cl100k_base` vocabulary (text-embedding-3-*, gpt-4 family)
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base()
            .map_err(|e| Error::Chunking(format!("Failed to load cl100k_base: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as u32)
            .collect()
    }

    fn token_lengths(&self, text: &str) -> Vec<usize> {
        self.bpe
            ._decode_native_and_split(self.bpe.encode_ordinary(text))
            .map(|bytes| bytes.len())
            .collect()
    }

    fn name(&self) -> &str {
        "cl100k_base"
    }
}

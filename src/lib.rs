//! docqa: question answering over uploaded documents
//!
//! Documents are extracted to text, split into overlapping token windows,
//! embedded, and stored in a flat or Qdrant vector index. Questions are
//! answered by a completion model from the chunks that clear a similarity
//! threshold.

pub mod answer;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod context;
pub mod embed;
pub mod embedding_backend;
pub mod error;
pub mod extract;
pub mod index;
pub mod meta;
pub mod progress;
pub mod storage;

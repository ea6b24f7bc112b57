//! Payload schema for Qdrant points

use crate::chunk::{Chunk, ChunkMetadata};
use crate::error::{Error, Result};
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Stable point id for chunk `index` of `doc_id`
pub fn chunk_point_id(doc_id: &str, index: usize) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}_{}", doc_id, index).as_bytes(),
    )
}

/// Payload stored with each chunk in Qdrant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Owning document
    pub doc_id: String,

    /// Chunk text
    pub content: String,

    pub filename: String,

    /// Chunk index within the document
    pub chunk: i64,

    pub source: String,
}

impl ChunkPayload {
    pub fn from_chunk(doc_id: &str, chunk: Chunk) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            content: chunk.content,
            filename: chunk.metadata.filename,
            chunk: chunk.metadata.chunk as i64,
            source: chunk.metadata.source,
        }
    }

    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("doc_id".to_string(), string_to_qdrant(&self.doc_id));
        map.insert("content".to_string(), string_to_qdrant(&self.content));
        map.insert("filename".to_string(), string_to_qdrant(&self.filename));
        map.insert("chunk".to_string(), int_to_qdrant(self.chunk));
        map.insert("source".to_string(), string_to_qdrant(&self.source));

        map
    }

    /// Split back into chunk text and metadata
    pub fn into_parts(self) -> (String, ChunkMetadata) {
        let metadata = ChunkMetadata {
            filename: self.filename,
            chunk: self.chunk.max(0) as usize,
            source: self.source,
            doc_id: Some(self.doc_id),
        };
        (self.content, metadata)
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::IntegerValue(i)),
    }
}

impl TryFrom<Map<String, Value>> for ChunkPayload {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Qdrant(format!("Malformed point payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            content: "Refunds are processed within 14 days.".to_string(),
            metadata: ChunkMetadata {
                filename: "policy.pdf".to_string(),
                chunk: 3,
                source: "policy.pdf".to_string(),
                doc_id: None,
            },
        }
    }

    #[test]
    fn test_point_ids_are_stable() {
        assert_eq!(chunk_point_id("doc", 0), chunk_point_id("doc", 0));
        assert_ne!(chunk_point_id("doc", 0), chunk_point_id("doc", 1));
        assert_ne!(chunk_point_id("doc", 0), chunk_point_id("other", 0));
    }

    #[test]
    fn test_payload_keys() {
        let payload = ChunkPayload::from_chunk("doc-1", sample_chunk()).to_qdrant_payload();
        for key in ["doc_id", "content", "filename", "chunk", "source"] {
            assert!(payload.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_payload_from_json_map() {
        let payload = ChunkPayload::from_chunk("doc-1", sample_chunk());
        let map = match serde_json::to_value(&payload).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let parsed = ChunkPayload::try_from(map).unwrap();
        let (content, metadata) = parsed.into_parts();
        assert_eq!(content, "Refunds are processed within 14 days.");
        assert_eq!(metadata.chunk, 3);
        assert_eq!(metadata.doc_id.as_deref(), Some("doc-1"));

        assert!(ChunkPayload::try_from(Map::new()).is_err());
    }
}

//! Qdrant vector database integration
//!
//! This module wraps the Qdrant client and provides:
//! - Collection management
//! - Point upsert and delete-by-document
//! - Filtered vector search

use super::{chunk_point_id, ChunkPayload, ChunkPoint, StoredHit, VectorStore};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance,
    Filter, GetCollectionInfoResponse, PointId, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Qdrant store handle
pub struct QdrantStore {
    client: Qdrant,
    url: String,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a store handle; no request is made until the first operation
    pub fn new(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            dimension,
        })
    }

    /// Ensure the collection exists with the expected vector size
    pub async fn ensure_collection(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            debug!("Collection {} already exists", self.collection);

            let info = self.client.collection_info(&self.collection).await?;
            if let Some(size) = extract_vector_size(&info) {
                if size as usize != self.dimension {
                    return Err(Error::Qdrant(format!(
                        "Collection '{}' has vector size {}, but the embedding model produces {}. Use a new collection name or re-upload documents.",
                        self.collection, size, self.dimension
                    )));
                }
            }

            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dimension as u64, Distance::Euclid),
                ),
            )
            .await?;

        Ok(())
    }

    /// Upsert points after checking every vector's dimension
    pub async fn upsert_points(&self, points: Vec<ChunkPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Qdrant(format!(
                "Vector dimension mismatch for collection '{}': expected {} (got {})",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<PointStruct> =
            points.into_iter().map(|p| p.to_point_struct()).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, point_structs).wait(true))
            .await?;

        Ok(())
    }

    async fn count(&self, filter: Option<Filter>) -> Result<usize> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let mut builder = CountPointsBuilder::new(&self.collection).exact(true);
        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }

        let response = self.client.count(builder).await?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

fn doc_filter(doc_id: &str) -> Filter {
    Filter::must([Condition::matches("doc_id", doc_id.to_string())])
}

fn extract_vector_size(info: &GetCollectionInfoResponse) -> Option<u64> {
    let result = info.result.as_ref()?;
    let config = result.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors_config = params.vectors_config.as_ref()?;

    match vectors_config.config.as_ref()? {
        qdrant_client::qdrant::vectors_config::Config::Params(params) => Some(params.size),
        qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(&self, doc_id: &str, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<()> {
        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| ChunkPoint {
                id: chunk_point_id(doc_id, i),
                vector,
                payload: ChunkPayload::from_chunk(doc_id, chunk),
            })
            .collect();

        self.upsert_points(points).await
    }

    async fn delete(&self, doc_id: &str) -> Result<usize> {
        let matched = self.count(Some(doc_filter(doc_id))).await?;
        if matched == 0 {
            return Ok(0);
        }

        debug!(
            "Deleting {} points for {} from collection {}",
            matched, doc_id, self.collection
        );

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(doc_filter(doc_id))
                    .wait(true),
            )
            .await?;

        Ok(matched)
    }

    async fn nearest(
        &self,
        query: &[f32],
        doc_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredHit>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query.to_vec(), limit as u64)
                .with_payload(true);

        if let Some(id) = doc_id {
            search_builder = search_builder.filter(doc_filter(id));
        }

        let response = self.client.search_points(search_builder).await?;

        let mut hits = Vec::with_capacity(response.result.len());
        for point in response.result {
            let id = point_id_to_string(point.id.clone());
            match hit_from_point(point) {
                Ok(hit) => hits.push(hit),
                Err(e) => warn!(point = %id, "Skipping point: {}", e),
            }
        }

        Ok(hits)
    }

    async fn len(&self) -> Result<usize> {
        self.count(None).await
    }

    fn location(&self) -> String {
        format!("{} (collection {})", self.url, self.collection)
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Convert PointId to string
/// Map a search result to a hit ranked like the flat index
///
/// Euclid scores are plain L2 distances; hits carry the squared distance.
fn hit_from_point(point: ScoredPoint) -> Result<StoredHit> {
    let map: serde_json::Map<String, Value> = point
        .payload
        .into_iter()
        .map(|(k, v)| (k, json_from_qdrant_value(v)))
        .collect();

    let (content, metadata) = ChunkPayload::try_from(map)?.into_parts();
    Ok(StoredHit {
        content,
        metadata,
        distance: point.score * point.score,
    })
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id {
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)),
        }) => uuid,
        Some(PointId {
            point_id_options: Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)),
        }) => num.to_string(),
        _ => String::new(),
    }
}

/// Convert Qdrant value to serde_json Value
fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;
    use crate::index::similarity;

    #[test]
    fn test_doc_filter() {
        let filter = doc_filter("doc-1");
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn test_json_from_qdrant_value() {
        let payload = ChunkPayload {
            doc_id: "d".to_string(),
            content: "c".to_string(),
            filename: "f.txt".to_string(),
            chunk: 7,
            source: "f.txt".to_string(),
        }
        .to_qdrant_payload();

        let map: serde_json::Map<String, Value> = payload
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect();
        assert_eq!(map["chunk"], Value::from(7));
        assert_eq!(map["filename"], Value::from("f.txt"));
    }

    fn scored(score: f32) -> ScoredPoint {
        ScoredPoint {
            payload: ChunkPayload {
                doc_id: "doc-1".to_string(),
                content: "Refunds take 14 days.".to_string(),
                filename: "policy.txt".to_string(),
                chunk: 2,
                source: "policy.txt".to_string(),
            }
            .to_qdrant_payload(),
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_from_point_squares_score() {
        let hit = hit_from_point(scored(1.0)).unwrap();
        assert_eq!(hit.distance, 1.0);
        assert_eq!(similarity(hit.distance), 0.5);
        assert_eq!(hit.content, "Refunds take 14 days.");
        assert_eq!(hit.metadata.chunk, 2);
        assert_eq!(hit.metadata.doc_id.as_deref(), Some("doc-1"));

        let hit = hit_from_point(scored(2.0)).unwrap();
        assert_eq!(hit.distance, 4.0);
        assert_eq!(similarity(hit.distance), 0.2);

        assert_eq!(hit_from_point(scored(0.0)).unwrap().distance, 0.0);
    }

    #[test]
    fn test_hit_from_point_rejects_bad_payload() {
        let mut point = scored(1.0);
        point.payload.remove("content");
        assert!(matches!(hit_from_point(point), Err(Error::Qdrant(_))));
    }

    #[tokio::test]
    async fn test_upsert_points_rejects_dimension_mismatch() {
        let store = QdrantStore::new("http://127.0.0.1:6334", "test_collection", 3)
            .expect("store should initialize");

        let chunk = Chunk {
            content: "text".to_string(),
            metadata: ChunkMetadata {
                filename: "a.txt".to_string(),
                chunk: 0,
                source: "a.txt".to_string(),
                doc_id: Some("doc-456".to_string()),
            },
        };

        let err = store
            .add("doc-456", vec![chunk], vec![vec![0.1, 0.2]])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Qdrant(message) => assert!(message.contains("Vector dimension mismatch")),
            other => panic!("expected qdrant error, got {other:?}"),
        }
        assert!(store.location().contains("test_collection"));
    }
}

use crate::error::IndexError;
use crate::models::{Chunk, RetrievedChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

/// Remote vector index backed by a Qdrant collection over HTTP. Durability
/// and isolation under concurrent writers are Qdrant's responsibility; every
/// upsert waits for the write to be applied before returning.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client,
            vector_size,
        })
    }

    /// Creates the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await
            .map_err(map_http)?;

        // 409 means the collection already exists.
        if response.status().is_success() || response.status().as_u16() == 409 {
            return Ok(());
        }

        Err(IndexError::BackendResponse {
            backend: "qdrant".to_string(),
            details: response.status().to_string(),
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let points = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                if embedding.len() != self.vector_size {
                    return Err(IndexError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": embedding,
                    "payload": {
                        "content": chunk.content,
                        "source": chunk.source,
                        "sequence_index": chunk.sequence_index,
                    },
                }))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(map_http)?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query_vector.len() != self.vector_size {
            return Err(IndexError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(map_http)?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await.map_err(map_http)?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let content = hit
                .pointer("/payload/content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let source = hit
                .pointer("/payload/source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let sequence_index = hit
                .pointer("/payload/sequence_index")
                .and_then(Value::as_u64)
                .unwrap_or_default();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            result.push(RetrievedChunk {
                chunk: Chunk {
                    content,
                    source,
                    sequence_index,
                },
                score,
            });
        }

        Ok(result)
    }

    async fn count(&self) -> Result<u64, IndexError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.endpoint, self.collection
            ))
            .json(&json!({ "exact": true }))
            .send()
            .await
            .map_err(map_http)?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await.map_err(map_http)?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "count response missing /result/count".to_string(),
            })
    }

    async fn sources(&self) -> Result<BTreeSet<String>, IndexError> {
        let mut sources = BTreeSet::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": 256,
                "with_payload": ["source"],
                "with_vector": false,
            });
            if let Some(next) = &offset {
                body["offset"] = next.clone();
            }

            let response = self
                .client
                .post(format!(
                    "{}/collections/{}/points/scroll",
                    self.endpoint, self.collection
                ))
                .json(&body)
                .send()
                .await
                .map_err(map_http)?;

            if !response.status().is_success() {
                return Err(IndexError::BackendResponse {
                    backend: "qdrant".to_string(),
                    details: response.status().to_string(),
                });
            }

            let parsed: Value = response.json().await.map_err(map_http)?;
            let points = parsed
                .pointer("/result/points")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for point in &points {
                if let Some(source) = point.pointer("/payload/source").and_then(Value::as_str) {
                    sources.insert(source.to_string());
                }
            }

            match parsed.pointer("/result/next_page_offset") {
                Some(next) if !next.is_null() => offset = Some(next.clone()),
                _ => break,
            }
        }

        Ok(sources)
    }
}

fn map_http(error: reqwest::Error) -> IndexError {
    if error.is_timeout() {
        IndexError::Timeout(error.to_string())
    } else {
        IndexError::Http(error)
    }
}

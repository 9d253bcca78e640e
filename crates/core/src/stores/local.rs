use crate::error::IndexError;
use crate::models::{Chunk, RetrievedChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: String,
    content: String,
    source: String,
    sequence_index: u64,
    embedding: Vec<f32>,
    ingested_at: DateTime<Utc>,
}

/// Whether [`LocalStore::open_or_create`] found an existing snapshot or
/// started a fresh index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    OpenedExisting { records: usize },
    CreatedNew,
}

/// File-backed vector index: all records in memory, cosine similarity
/// search, and a JSON snapshot rewritten atomically on every batch add.
/// Suitable for a single process; concurrent callers serialize on the
/// internal lock.
pub struct LocalStore {
    path: PathBuf,
    records: RwLock<Vec<StoredRecord>>,
}

impl LocalStore {
    /// Opens the snapshot at `path` if present, otherwise starts empty.
    /// A corrupt snapshot is an error, not silently discarded.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<(Self, OpenOutcome), IndexError> {
        let path = path.into();

        if path.exists() {
            let bytes = fs::read(&path)?;
            let records: Vec<StoredRecord> = serde_json::from_slice(&bytes)?;
            let outcome = OpenOutcome::OpenedExisting {
                records: records.len(),
            };
            Ok((
                Self {
                    path,
                    records: RwLock::new(records),
                },
                outcome,
            ))
        } else {
            Ok((
                Self {
                    path,
                    records: RwLock::new(Vec::new()),
                },
                OpenOutcome::CreatedNew,
            ))
        }
    }

    /// Clears the index and removes the snapshot file. Administrative.
    pub fn reset(&self) -> Result<(), IndexError> {
        let mut records = self.write_lock()?;
        records.clear();

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(IndexError::Io(error)),
        }
    }

    fn persist(&self, records: &[StoredRecord]) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredRecord>>, IndexError> {
        self.records
            .read()
            .map_err(|_| IndexError::Request("index lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<StoredRecord>>, IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::Request("index lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorIndex for LocalStore {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let ingested_at = Utc::now();
        let mut records = self.write_lock()?;

        // Build the full post-add record set first and persist it before
        // touching memory, so a failed write leaves the index unchanged.
        let mut appended = records.clone();
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            appended.push(StoredRecord {
                id: make_record_id(chunk),
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                sequence_index: chunk.sequence_index,
                embedding: embedding.clone(),
                ingested_at,
            });
        }

        self.persist(&appended)?;
        *records = appended;
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        let records = self.read_lock()?;

        let mut hits: Vec<RetrievedChunk> = records
            .iter()
            .map(|record| RetrievedChunk {
                chunk: Chunk {
                    content: record.content.clone(),
                    source: record.source.clone(),
                    sequence_index: record.sequence_index,
                },
                score: cosine_similarity(query_vector, &record.embedding),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<u64, IndexError> {
        Ok(self.read_lock()?.len() as u64)
    }

    async fn sources(&self) -> Result<BTreeSet<String>, IndexError> {
        Ok(self
            .read_lock()?
            .iter()
            .map(|record| record.source.clone())
            .collect())
    }
}

fn make_record_id(chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source.as_bytes());
    hasher.update(chunk.sequence_index.to_le_bytes());
    hasher.update(chunk.content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() {
        return 0.0;
    }

    let dot = left
        .iter()
        .zip(right.iter())
        .map(|(a, b)| (a * b) as f64)
        .sum::<f64>();
    let norm_left = left.iter().map(|a| (a * a) as f64).sum::<f64>().sqrt();
    let norm_right = right.iter().map(|b| (b * b) as f64).sum::<f64>().sqrt();

    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }

    dot / (norm_left * norm_right)
}

use crate::error::{IndexError, QueryError};
use crate::models::{Chunk, RetrievedChunk};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Stores embedded chunks and answers nearest-neighbor queries. The index is
/// the only shared mutable state in the subsystem; implementations own
/// durability and isolation under concurrent callers.
#[async_trait]
pub trait VectorIndex {
    /// Adds one document's chunks as a single batch. Either the whole batch
    /// is durably stored or the index is left observably unchanged.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), IndexError>;

    /// Returns up to `k` stored chunks nearest to `query_vector`, nearest
    /// first. An empty index yields an empty list, not an error.
    async fn search(&self, query_vector: &[f32], k: usize)
        -> Result<Vec<RetrievedChunk>, IndexError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<u64, IndexError>;

    /// Distinct source names across stored chunks.
    async fn sources(&self) -> Result<BTreeSet<String>, IndexError>;
}

/// Answers a prompt. Opaque to the core; remote or local.
#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, QueryError>;
}

#[async_trait]
impl<G> Generator for Box<G>
where
    G: Generator + ?Sized + Send + Sync,
{
    async fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        (**self).generate(prompt).await
    }
}

pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod generators;
pub mod ingest;
pub mod models;
pub mod stores;
pub mod traits;

pub use chunking::split_text;
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use engine::{QueryEngine, DEFAULT_TOP_K};
pub use error::{EmbedError, IndexError, IngestError, QueryError};
pub use extractor::extract_text;
pub use generators::{ExtractiveGenerator, HttpGenerator};
pub use ingest::{discover_document_files, IngestionPipeline, IngestionReport, SkippedFile};
pub use models::{
    Answer, Chunk, ChunkingOptions, GroundingPolicy, MediaType, RetrievedChunk,
};
pub use stores::{LocalStore, OpenOutcome, QdrantStore};
pub use traits::{Generator, VectorIndex};

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// The atomic unit stored and retrieved: a bounded substring of one source
/// document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    /// File name of the originating document.
    pub source: String,
    /// 0-based position within the source, strictly increasing per ingestion.
    pub sequence_index: u64,
}

/// A chunk returned by a similarity query. Rank is the position in the
/// returned list; `score` is the index's similarity (higher is closer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// Generated answer plus the distinct sources it was grounded on.
/// `grounded` is false when no relevant chunks were retrieved and the
/// fallback policy was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: BTreeSet<String>,
    pub grounded: bool,
}

/// Declared media type of an uploaded document. Never sniffed from content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    PlainText,
    Markdown,
}

impl MediaType {
    /// Maps a declared media-type string (MIME or shorthand).
    pub fn from_declared(declared: &str) -> Result<Self, IngestError> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "application/pdf" | "pdf" => Ok(Self::Pdf),
            "text/plain" | "plain-text" | "txt" => Ok(Self::PlainText),
            "text/markdown" | "markdown" | "md" => Ok(Self::Markdown),
            other => Err(IngestError::UnsupportedMediaType(other.to_string())),
        }
    }

    /// Maps a file extension, for folder ingestion.
    pub fn for_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::PlainText),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(IngestError::UnsupportedMediaType(format!(
                "no media type for path {}",
                path.display()
            ))),
        }
    }
}

/// Target chunk geometry, in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// What the query engine does when retrieval returns no chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundingPolicy {
    /// Answer from the generator's general knowledge, flagged ungrounded.
    #[default]
    GeneralKnowledge,
    /// Return a fixed cannot-answer message without calling the generator.
    Decline,
}

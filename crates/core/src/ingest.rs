use crate::chunking::split_text;
use crate::embeddings::Embedder;
use crate::error::{IndexError, IngestError};
use crate::extractor::extract_text;
use crate::models::{Chunk, ChunkingOptions, MediaType};
use crate::traits::VectorIndex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Turns uploaded documents into persisted, retrievable chunks.
///
/// Collaborators are passed in at construction; the pipeline keeps no state
/// of its own and can run concurrently with other pipelines sharing the
/// same index.
pub struct IngestionPipeline<I, E> {
    index: I,
    embedder: E,
    options: ChunkingOptions,
}

/// A file the folder ingestion could not process, with the reason.
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    /// Successfully ingested files with their chunk counts.
    pub ingested: Vec<(PathBuf, u64)>,
    pub skipped: Vec<SkippedFile>,
}

impl<I, E> IngestionPipeline<I, E>
where
    I: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(index: I, embedder: E, options: ChunkingOptions) -> Self {
        Self {
            index,
            embedder,
            options,
        }
    }

    /// Extracts, chunks, embeds, and stores one document. Returns the number
    /// of chunks added. All chunks are embedded before the single batch add,
    /// so any failure leaves the index observably unchanged; the error names
    /// the document and the stage that failed.
    ///
    /// Re-ingesting the same `source` appends a second, independent chunk
    /// set. Nothing is deduplicated or replaced.
    pub async fn ingest_document(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        source: &str,
    ) -> Result<u64, IngestError> {
        let text = extract_text(bytes, media_type)?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument(source.to_string()));
        }

        let chunks: Vec<Chunk> = split_text(&text, &self.options)?
            .into_iter()
            .enumerate()
            .map(|(position, content)| Chunk {
                content,
                source: source.to_string(),
                sequence_index: position as u64,
            })
            .collect();

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let embedding =
                self.embedder
                    .embed(&chunk.content)
                    .map_err(|cause| IngestError::Embedding {
                        document: source.to_string(),
                        cause,
                    })?;
            embeddings.push(embedding);
        }

        self.index
            .add(&chunks, &embeddings)
            .await
            .map_err(|cause| match cause {
                IndexError::Timeout(details) => IngestError::Timeout(details),
                other => IngestError::Storage {
                    document: source.to_string(),
                    cause: other,
                },
            })?;

        Ok(chunks.len() as u64)
    }

    /// Ingests every supported file under `folder`, best effort: files that
    /// fail are reported, not fatal. Fails only when the folder holds no
    /// ingestable files at all.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<IngestionReport, IngestError> {
        let files = discover_document_files(folder);

        if files.is_empty() {
            return Err(IngestError::InvalidInput(format!(
                "no ingestable files found in {}",
                folder.display()
            )));
        }

        let mut ingested = Vec::new();
        let mut skipped = Vec::new();

        for path in files {
            match self.ingest_file(&path).await {
                Ok(chunk_count) => ingested.push((path, chunk_count)),
                Err(error) => skipped.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(IngestionReport { ingested, skipped })
    }

    async fn ingest_file(&self, path: &Path) -> Result<u64, IngestError> {
        let media_type = MediaType::for_path(path)?;
        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                IngestError::InvalidInput(format!("path missing filename: {}", path.display()))
            })?;

        let bytes = fs::read(path)?;
        self.ingest_document(&bytes, media_type, source).await
    }

    /// Total number of stored chunks in the underlying index.
    pub async fn document_count(&self) -> Result<u64, IndexError> {
        self.index.count().await
    }

    /// Distinct source names among stored chunks.
    pub async fn list_sources(&self) -> Result<BTreeSet<String>, IndexError> {
        self.index.sources().await
    }
}

/// Recursively finds ingestable files (pdf, txt, md) under `folder`, sorted.
pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if MediaType::for_path(entry.path()).is_ok() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::EmbedError;
    use crate::models::RetrievedChunk;
    use crate::stores::LocalStore;
    use async_trait::async_trait;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn local_pipeline(
        dir: &Path,
    ) -> IngestionPipeline<LocalStore, CharacterNgramEmbedder> {
        let (store, _) = LocalStore::open_or_create(dir.join("chunks.json")).unwrap();
        IngestionPipeline::new(
            store,
            CharacterNgramEmbedder::default(),
            ChunkingOptions::default(),
        )
    }

    #[tokio::test]
    async fn empty_document_is_rejected_without_storage_writes() {
        let dir = tempdir().unwrap();
        let pipeline = local_pipeline(dir.path());

        let result = pipeline
            .ingest_document(b"   \n\t  ", MediaType::PlainText, "blank.txt")
            .await;

        assert!(matches!(result, Err(IngestError::EmptyDocument(name)) if name == "blank.txt"));
        assert_eq!(pipeline.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn plain_text_document_is_chunked_and_counted() {
        let dir = tempdir().unwrap();
        let pipeline = local_pipeline(dir.path());

        // 3000 chars, no break candidates: windows at 0, 800, 1600, 2400.
        let text = "a".repeat(3_000);
        let chunk_count = pipeline
            .ingest_document(text.as_bytes(), MediaType::PlainText, "doc1.txt")
            .await
            .unwrap();

        assert_eq!(chunk_count, 4);
        assert_eq!(pipeline.document_count().await.unwrap(), 4);

        let sources = pipeline.list_sources().await.unwrap();
        assert!(sources.contains("doc1.txt"));
    }

    #[tokio::test]
    async fn reingesting_the_same_source_appends() {
        let dir = tempdir().unwrap();
        let pipeline = local_pipeline(dir.path());
        let text = "b".repeat(2_000);

        let first = pipeline
            .ingest_document(text.as_bytes(), MediaType::PlainText, "doc.txt")
            .await
            .unwrap();
        let second = pipeline
            .ingest_document(text.as_bytes(), MediaType::PlainText, "doc.txt")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(pipeline.document_count().await.unwrap(), first + second);
        assert_eq!(pipeline.list_sources().await.unwrap().len(), 1);
    }

    struct RejectingIndex;

    #[async_trait]
    impl VectorIndex for RejectingIndex {
        async fn add(&self, _chunks: &[Chunk], _embeddings: &[Vec<f32>]) -> Result<(), IndexError> {
            Err(IndexError::Request("backend unavailable".to_string()))
        }

        async fn search(
            &self,
            _query_vector: &[f32],
            _k: usize,
        ) -> Result<Vec<RetrievedChunk>, IndexError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<u64, IndexError> {
            Ok(0)
        }

        async fn sources(&self) -> Result<BTreeSet<String>, IndexError> {
            Ok(BTreeSet::new())
        }
    }

    #[tokio::test]
    async fn storage_failure_names_the_document() {
        let pipeline = IngestionPipeline::new(
            RejectingIndex,
            CharacterNgramEmbedder::default(),
            ChunkingOptions::default(),
        );

        let result = pipeline
            .ingest_document(b"some real content", MediaType::PlainText, "doc.txt")
            .await;

        assert!(
            matches!(result, Err(IngestError::Storage { document, .. }) if document == "doc.txt")
        );
        assert_eq!(pipeline.document_count().await.unwrap(), 0);
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError("quota exhausted".to_string()))
        }
    }

    #[tokio::test]
    async fn embedding_failure_leaves_the_index_unchanged() {
        let dir = tempdir().unwrap();
        let snapshot = dir.path().join("chunks.json");
        let (store, _) = LocalStore::open_or_create(&snapshot).unwrap();
        let pipeline =
            IngestionPipeline::new(store, FailingEmbedder, ChunkingOptions::default());

        let result = pipeline
            .ingest_document(b"content to embed", MediaType::PlainText, "doc.txt")
            .await;

        assert!(matches!(result, Err(IngestError::Embedding { .. })));
        assert_eq!(pipeline.document_count().await.unwrap(), 0);
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn folder_ingestion_is_recursive_and_best_effort() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        let nested = docs.join("nested");
        fs::create_dir_all(&nested).unwrap();

        File::create(docs.join("a.txt"))
            .and_then(|mut file| file.write_all("first document body ".repeat(10).as_bytes()))
            .unwrap();
        File::create(nested.join("b.md"))
            .and_then(|mut file| file.write_all(b"# Title\n\nsecond document body"))
            .unwrap();
        // Unreadable as a PDF: reported, not fatal.
        File::create(docs.join("broken.pdf"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%broken"))
            .unwrap();
        // Unsupported extension: never discovered.
        File::create(docs.join("ignored.zip"))
            .and_then(|mut file| file.write_all(b"zip"))
            .unwrap();

        let pipeline = local_pipeline(dir.path());
        let report = pipeline.ingest_folder(&docs).await.unwrap();

        assert_eq!(report.ingested.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            report.skipped[0].path.file_name().and_then(|n| n.to_str()),
            Some("broken.pdf")
        );

        let sources = pipeline.list_sources().await.unwrap();
        assert!(sources.contains("a.txt"));
        assert!(sources.contains("b.md"));
    }

    #[tokio::test]
    async fn folder_without_ingestable_files_is_an_error() {
        let dir = tempdir().unwrap();
        let pipeline = local_pipeline(dir.path());

        let empty = dir.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        let result = pipeline.ingest_folder(&empty).await;
        assert!(matches!(result, Err(IngestError::InvalidInput(_))));
    }
}

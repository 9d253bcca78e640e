use thiserror::Error;

/// Failure reported by an embedding collaborator.
#[derive(Debug, Error)]
#[error("embedding service error: {0}")]
pub struct EmbedError(pub String);

/// Failure reported by a vector index backend.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index request failed: {0}")]
    Request(String),

    #[error("index call timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("document is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("document {0} is empty after extraction")]
    EmptyDocument(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding chunks of {document} failed: {cause}")]
    Embedding {
        document: String,
        #[source]
        cause: EmbedError,
    },

    #[error("storing chunks of {document} failed: {cause}")]
    Storage {
        document: String,
        #[source]
        cause: IndexError,
    },

    #[error("external call timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question is empty")]
    InvalidQuestion,

    #[error("top_k must be positive")]
    InvalidTopK,

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("generation call timed out: {0}")]
    Timeout(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

pub mod local;
pub mod qdrant;

pub use local::{LocalStore, OpenOutcome};
pub use qdrant::QdrantStore;

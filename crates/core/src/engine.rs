use crate::embeddings::Embedder;
use crate::error::QueryError;
use crate::models::{Answer, GroundingPolicy, RetrievedChunk};
use crate::traits::{Generator, VectorIndex};
use std::collections::BTreeSet;

pub const DEFAULT_TOP_K: usize = 3;

pub(crate) const CONTEXT_HEADER: &str = "Context:\n";
pub(crate) const QUESTION_HEADER: &str = "\n\nQuestion: ";

const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

const DECLINE_MESSAGE: &str = "No relevant documents were found in the index, \
so this question cannot be answered from the ingested material.";

/// Answers a question by grounding a generation call in the nearest
/// previously ingested chunks. Stateless per call; retries are a caller
/// concern.
pub struct QueryEngine<I, G, E> {
    index: I,
    generator: G,
    embedder: E,
    policy: GroundingPolicy,
}

impl<I, G, E> QueryEngine<I, G, E>
where
    I: VectorIndex + Send + Sync,
    G: Generator + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(index: I, generator: G, embedder: E) -> Self {
        Self {
            index,
            generator,
            embedder,
            policy: GroundingPolicy::default(),
        }
    }

    /// Selects what happens when retrieval returns no chunks.
    pub fn with_policy(mut self, policy: GroundingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retrieves the `k` nearest chunks, composes a grounded prompt, and
    /// returns the generated answer with source attribution. An empty index
    /// is not an error; the configured [`GroundingPolicy`] applies and the
    /// returned answer is flagged ungrounded.
    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::InvalidQuestion);
        }
        if k == 0 {
            return Err(QueryError::InvalidTopK);
        }

        let query_vector = self.embedder.embed(question)?;
        let hits = self.index.search(&query_vector, k).await?;

        if hits.is_empty() {
            return self.answer_ungrounded(question).await;
        }

        let sources: BTreeSet<String> = hits.iter().map(|hit| hit.chunk.source.clone()).collect();
        let prompt = grounded_prompt(question, &hits);
        let text = self.generator.generate(&prompt).await?;

        Ok(Answer {
            text,
            sources,
            grounded: true,
        })
    }

    async fn answer_ungrounded(&self, question: &str) -> Result<Answer, QueryError> {
        match self.policy {
            GroundingPolicy::GeneralKnowledge => {
                let text = self.generator.generate(question).await?;
                Ok(Answer {
                    text,
                    sources: BTreeSet::new(),
                    grounded: false,
                })
            }
            GroundingPolicy::Decline => Ok(Answer {
                text: DECLINE_MESSAGE.to_string(),
                sources: BTreeSet::new(),
                grounded: false,
            }),
        }
    }
}

/// Wraps the retrieved chunks, nearest first, in an instruction that confines
/// the generator to the supplied context.
fn grounded_prompt(question: &str, hits: &[RetrievedChunk]) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    format!(
        "You are a helpful assistant. Answer the user's question using only \
the context below. If the answer is not contained in the context, say that \
you cannot answer from the information provided.\n\n\
{CONTEXT_HEADER}{context}{QUESTION_HEADER}{question}"
    )
}

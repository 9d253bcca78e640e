use crate::engine::{CONTEXT_HEADER, QUESTION_HEADER};
use crate::error::QueryError;
use crate::traits::Generator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const EXTRACT_LIMIT_CHARS: usize = 700;

/// Remote text-generation endpoint: POSTs `{"prompt": ...}` and reads
/// `{"text": ...}` back. Bearer auth when a key is configured.
pub struct HttpGenerator {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| QueryError::Generation(error.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(map_http)?;

        if !response.status().is_success() {
            return Err(QueryError::Generation(format!(
                "generation endpoint {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(map_http)?;
        payload
            .pointer("/text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| QueryError::Generation("generation response has no text".to_string()))
    }
}

/// Offline fallback: extracts the grounding context from the prompt and
/// echoes the leading passages. Keeps the CLI usable with no remote
/// generation endpoint configured. Relies on the prompt layout produced by
/// the query engine; an unrecognized prompt is echoed as-is.
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let context = prompt
            .split_once(CONTEXT_HEADER)
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.split_once(QUESTION_HEADER).map(|(context, _)| context))
            .unwrap_or(prompt)
            .trim();

        let mut text: String = context.chars().take(EXTRACT_LIMIT_CHARS).collect();
        if context.chars().count() > EXTRACT_LIMIT_CHARS {
            text.push_str(" [...]");
        }

        Ok(format!(
            "Most relevant passages from the ingested documents:\n\n{text}"
        ))
    }
}

fn map_http(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::Timeout(error.to_string())
    } else {
        QueryError::Generation(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extractive_generator_pulls_the_context_section() {
        let prompt = format!(
            "instructions here\n\n{CONTEXT_HEADER}first passage\n\n---\n\nsecond \
passage{QUESTION_HEADER}what is covered?"
        );

        let answer = ExtractiveGenerator.generate(&prompt).await.unwrap();
        assert!(answer.contains("first passage"));
        assert!(answer.contains("second passage"));
        assert!(!answer.contains("what is covered?"));
    }

    #[tokio::test]
    async fn extractive_generator_echoes_unrecognized_prompts() {
        let answer = ExtractiveGenerator
            .generate("a bare question with no context")
            .await
            .unwrap();
        assert!(answer.contains("a bare question with no context"));
    }

    #[tokio::test]
    async fn long_context_is_truncated_with_a_marker() {
        let prompt = format!(
            "{CONTEXT_HEADER}{}{QUESTION_HEADER}q",
            "x".repeat(EXTRACT_LIMIT_CHARS * 2)
        );

        let answer = ExtractiveGenerator.generate(&prompt).await.unwrap();
        assert!(answer.ends_with("[...]"));
    }
}

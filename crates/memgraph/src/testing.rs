//! Test utilities - deterministic collaborator mocks
//!
//! These make collaborator failures and exact similarity values easy to
//! reproduce in unit and integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::memory::MemoryRecord;
use crate::provider::{Embedder, Generator, HashEmbedder, ProviderError, Summarizer};

/// Embedder returning fixed vectors for known texts and hash embeddings
/// for everything else
#[derive(Debug, Clone)]
pub struct KeyedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: HashEmbedder,
}

impl KeyedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: HashEmbedder::new(dimension),
        }
    }

    /// Map `text` to `vector`. The vector must have the embedder's
    /// dimension.
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for KeyedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.embed_text(text)))
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension()
    }

    fn name(&self) -> &'static str {
        "keyed"
    }
}

/// Embedder that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Embedding("embedding backend unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Summarizer that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _contents: &[String]) -> Result<String, ProviderError> {
        Err(ProviderError::Summarization("summarizer unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Summarizer that records every chunk it is given
#[derive(Debug, Default)]
pub struct RecordingSummarizer {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks received so far, in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, contents: &[String]) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(contents.to_vec());
        }
        Ok(format!("summary of {} turns", contents.len()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Generator that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(
        &self,
        _query: &str,
        _memories: &[MemoryRecord],
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Generation("generator unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Generator that never answers
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledGenerator;

#[async_trait]
impl Generator for StalledGenerator {
    async fn generate(
        &self,
        _query: &str,
        _memories: &[MemoryRecord],
    ) -> Result<String, ProviderError> {
        std::future::pending().await
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyed_embedder_prefers_fixed_vectors() {
        let embedder = KeyedEmbedder::new(3).with("north", vec![1.0, 0.0, 0.0]);
        assert_eq!(embedder.embed("north").await.unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(embedder.embed("south").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recording_summarizer_keeps_calls() {
        let summarizer = RecordingSummarizer::new();
        summarizer.summarize(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(summarizer.calls(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn failing_mocks_fail() {
        assert!(FailingEmbedder.embed("x").await.is_err());
        assert!(FailingSummarizer.summarize(&[]).await.is_err());
        assert!(FailingGenerator.generate("x", &[]).await.is_err());
    }
}

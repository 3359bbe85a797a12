//! Collaborator interfaces
//!
//! The engine depends on four external collaborators: an embedder, a
//! similarity function, a summarizer (used by consolidation) and a
//! generator (used by the turn runner, never by the engine itself). Each
//! is a trait so deployments can swap the built-in deterministic
//! implementations for model-backed ones.

pub mod hash;
pub mod local;
pub mod prompts;
pub mod remote;

#[cfg(feature = "fastembed")]
pub mod fastembed;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{MemGraphError, Result};
use crate::memory::MemoryRecord;

pub use hash::{CosineSimilarity, HashEmbedder, cosine_similarity};
pub use local::{ExtractiveSummarizer, TemplateGenerator};
pub use remote::RemoteLlm;

/// Collaborator-specific errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Embedding failed: {0}")]
    Embedding(String),
    #[error("Similarity failed: {0}")]
    Similarity(String),
    #[error("Summarization failed: {0}")]
    Summarization(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for identical input so retrieval
/// stays reproducible.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Deterministic similarity between two embeddings
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &[f32], b: &[f32]) -> std::result::Result<f32, ProviderError>;
}

/// Folds several record contents into one summary. May fail; the
/// consolidation engine falls back to a deterministic summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, contents: &[String]) -> std::result::Result<String, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Produces a reply from a query and the retrieved records. Pure consumer
/// of engine state.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        memories: &[MemoryRecord],
    ) -> std::result::Result<String, ProviderError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// The full collaborator set selected by configuration
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Arc<dyn Embedder>,
    pub similarity: Arc<dyn Similarity>,
    pub summarizer: Arc<dyn Summarizer>,
    pub generator: Arc<dyn Generator>,
}

impl Collaborators {
    /// Deterministic built-in collaborators with the given embedding dimension
    pub fn local(dimension: usize) -> Self {
        Self {
            embedder: Arc::new(HashEmbedder::new(dimension)),
            similarity: Arc::new(CosineSimilarity),
            summarizer: Arc::new(ExtractiveSummarizer::default()),
            generator: Arc::new(TemplateGenerator),
        }
    }

    /// Build the collaborators named by `config.embedding` and `config.llm`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut collaborators = Self::local(config.embedding.dimension);

        match config.embedding.provider.as_str() {
            "hash" => {}
            #[cfg(feature = "fastembed")]
            "fastembed" => {
                collaborators.embedder = Arc::new(fastembed::FastEmbedder::new()?);
            }
            other => {
                return Err(MemGraphError::Config(format!(
                    "Unknown embedding provider: {other}"
                )));
            }
        }

        match config.llm.provider.as_str() {
            "local" => {}
            "remote" => {
                let remote = Arc::new(RemoteLlm::new(&config.llm.remote)?);
                collaborators.summarizer = remote.clone();
                collaborators.generator = remote;
            }
            other => {
                return Err(MemGraphError::Config(format!("Unknown llm provider: {other}")));
            }
        }

        tracing::debug!(
            embedder = collaborators.embedder.name(),
            summarizer = collaborators.summarizer.name(),
            generator = collaborators.generator.name(),
            "Collaborators selected"
        );

        Ok(collaborators)
    }
}

//! Local model embeddings via fastembed (feature `fastembed`)

use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::provider::{Embedder, ProviderError};

/// Output length of MultilingualE5Small
pub const FASTEMBED_DIMENSION: usize = 384;

/// Embedder backed by a local ONNX model
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    /// Load the model, downloading it on first use
    pub fn new() -> Result<Self, ProviderError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::MultilingualE5Small))
            .map_err(|e| ProviderError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| ProviderError::Embedding("embedding model lock poisoned".to_string()))?;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| ProviderError::Embedding(e.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Embedding("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        FASTEMBED_DIMENSION
    }

    fn name(&self) -> &'static str {
        "fastembed"
    }
}

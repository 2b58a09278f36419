//! Sentence-embedding backend built on fastembed.
//!
//! fastembed embeds whole strings, so the filtered tokens are joined back into a
//! single space-separated document. The vocabulary is the one accumulated by the
//! corpus pass.

use std::sync::Mutex;

use fastembed::TextEmbedding;
use tracing::info;

use crate::{
    error::{PipelineError, Result},
    nlp::{model::EmbeddingModel, vocab::VocabularySet},
};

pub struct FastEmbedModel {
    embedder: Mutex<TextEmbedding>,
    vocabulary: VocabularySet,
    dimension: usize,
}

impl FastEmbedModel {
    pub fn try_new(vocabulary: VocabularySet) -> Result<Self> {
        let mut embedder = TextEmbedding::try_new(Default::default())
            .map_err(|err| PipelineError::Model(err.to_string()))?;
        let probe = embedder
            .embed(vec!["probe".to_string()], None)
            .map_err(|err| PipelineError::Model(err.to_string()))?;
        let dimension = probe.first().map(Vec::len).unwrap_or_default();
        info!(dimension, words = vocabulary.len(), "loaded fastembed model");
        Ok(Self {
            embedder: Mutex::new(embedder),
            vocabulary,
            dimension,
        })
    }
}

impl EmbeddingModel for FastEmbedModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vocabulary(&self) -> &VocabularySet {
        &self.vocabulary
    }

    fn infer(&self, tokens: &[String]) -> Result<Vec<f32>> {
        if tokens.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }
        let mut embedder = self
            .embedder
            .lock()
            .map_err(|_| PipelineError::Model("fastembed lock poisoned".into()))?;
        let embeddings = embedder
            .embed(vec![tokens.join(" ")], None)
            .map_err(|err| PipelineError::Model(err.to_string()))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Model("fastembed returned no embedding".into()))
    }
}

//! Embedding model capability used by the inference pass.
//!
//! The pipeline only ever talks to [`EmbeddingModel`] and [`ModelTrainer`]. The
//! built-in [`HashedMeanModel`] gives every vocabulary word a deterministic
//! pseudo-random vector and averages the vectors of a document's words, which is
//! enough to run the pipeline end to end without an external trainer.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use indexmap::IndexMap;
use ndarray::Array1;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{PipelineError, Result},
    nlp::vocab::VocabularySet,
};

/// A trained model able to turn a token sequence into a fixed-length vector.
pub trait EmbeddingModel {
    /// Length of every vector returned by [`EmbeddingModel::infer`].
    fn dimension(&self) -> usize;

    /// Words the model knows; tokens outside this set are filtered before inference.
    fn vocabulary(&self) -> &VocabularySet;

    /// Infer a document vector. Empty input must not fail.
    fn infer(&self, tokens: &[String]) -> Result<Vec<f32>>;
}

/// Trains a model from a line-per-document corpus file.
pub trait ModelTrainer {
    type Model: EmbeddingModel;

    fn train(&self, corpus: &Path) -> Result<Self::Model>;
}

/// Mean of deterministic per-word vectors.
#[derive(Debug, Clone)]
pub struct HashedMeanModel {
    dimension: usize,
    seed: u64,
    vocabulary: VocabularySet,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    dimension: usize,
    seed: u64,
    words: Vec<String>,
}

impl HashedMeanModel {
    pub fn new(dimension: usize, seed: u64, vocabulary: VocabularySet) -> Result<Self> {
        if dimension == 0 {
            return Err(PipelineError::InvalidConfig(
                "vector dimension must be positive".into(),
            ));
        }
        Ok(Self {
            dimension,
            seed,
            vocabulary,
        })
    }

    /// Vector assigned to a single word, stable across runs for a given seed.
    pub fn word_vector(&self, word: &str) -> Array1<f32> {
        let mut rng = StdRng::seed_from_u64(fnv1a(word.as_bytes()) ^ self.seed);
        let scale = self.dimension as f32;
        Array1::from_shape_fn(self.dimension, |_| (rng.gen::<f32>() - 0.5) / scale)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| PipelineError::io(err, parent))?;
        }
        let file = File::create(path).map_err(|err| PipelineError::io(err, path))?;
        let payload = ModelFile {
            dimension: self.dimension,
            seed: self.seed,
            words: self.vocabulary.iter().map(str::to_string).collect(),
        };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &payload)?;
        writer.flush().map_err(|err| PipelineError::io(err, path))?;
        info!(path = %path.display(), words = payload.words.len(), "saved model");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| PipelineError::io(err, path))?;
        let payload: ModelFile = serde_json::from_reader(BufReader::new(file))?;
        Self::new(
            payload.dimension,
            payload.seed,
            payload.words.into_iter().collect(),
        )
    }
}

impl EmbeddingModel for HashedMeanModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vocabulary(&self) -> &VocabularySet {
        &self.vocabulary
    }

    fn infer(&self, tokens: &[String]) -> Result<Vec<f32>> {
        let mut sum = Array1::<f32>::zeros(self.dimension);
        let mut known = 0usize;
        for token in tokens.iter().filter(|t| self.vocabulary.contains(t)) {
            sum += &self.word_vector(token);
            known += 1;
        }
        if known > 0 {
            sum /= known as f32;
        }
        Ok(sum.to_vec())
    }
}

/// Builds a [`HashedMeanModel`] from words seen at least `min_count` times.
#[derive(Debug, Clone)]
pub struct HashedMeanTrainer {
    pub dimension: usize,
    pub min_count: usize,
    pub seed: u64,
}

impl ModelTrainer for HashedMeanTrainer {
    type Model = HashedMeanModel;

    fn train(&self, corpus: &Path) -> Result<Self::Model> {
        let file = File::open(corpus).map_err(|err| PipelineError::io(err, corpus))?;
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        let mut documents = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| PipelineError::io(err, corpus))?;
            documents += 1;
            for word in line.split_whitespace() {
                *counts.entry(word.to_string()).or_insert(0) += 1;
            }
        }
        let vocabulary: VocabularySet = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.min_count)
            .map(|(word, _)| word)
            .collect();
        info!(
            documents,
            words = vocabulary.len(),
            min_count = self.min_count,
            "trained hashed mean model"
        );
        HashedMeanModel::new(self.dimension, self.seed, vocabulary)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn model(words: &[&str]) -> HashedMeanModel {
        HashedMeanModel::new(8, 7, words.iter().copied().collect()).expect("model")
    }

    #[test]
    fn empty_input_yields_zero_vector() {
        let vector = model(&["gear"]).infer(&[]).expect("infer");
        assert_eq!(vector, vec![0.0; 8]);
    }

    #[test]
    fn single_word_document_matches_word_vector() {
        let model = model(&["gear"]);
        let vector = model.infer(&["gear".to_string()]).expect("infer");
        assert_eq!(vector, model.word_vector("gear").to_vec());
    }

    #[test]
    fn trainer_respects_min_count() {
        let dir = tempdir().expect("tempdir");
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, "gear shaft gear\nshaft rotor\n").expect("write corpus");
        let trainer = HashedMeanTrainer {
            dimension: 4,
            min_count: 2,
            seed: 1,
        };
        let model = trainer.train(&corpus).expect("train");
        assert!(model.vocabulary().contains("gear"));
        assert!(model.vocabulary().contains("shaft"));
        assert!(!model.vocabulary().contains("rotor"));
    }

    #[test]
    fn save_and_load_preserve_vectors() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        let original = model(&["gear", "shaft"]);
        original.save(&path).expect("save");
        let reloaded = HashedMeanModel::load(&path).expect("load");
        let tokens = vec!["gear".to_string(), "shaft".to_string()];
        assert_eq!(
            original.infer(&tokens).expect("infer"),
            reloaded.infer(&tokens).expect("infer")
        );
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(HashedMeanModel::new(0, 0, VocabularySet::new()).is_err());
    }
}

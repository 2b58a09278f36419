//! Text normalisation, vocabulary and embedding model layer.

#[cfg(feature = "embeddings")]
pub mod embeddings;
pub mod model;
pub mod text;
pub mod vocab;

pub use model::{EmbeddingModel, HashedMeanModel, HashedMeanTrainer, ModelTrainer};
pub use text::{strip_punctuation, tokenize, tokenize_all};
pub use vocab::VocabularySet;

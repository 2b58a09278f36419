//! Shard-streaming corpus, vocabulary and vector pipeline for patent claim text.
//!
//! Source rows `(entity_id, ordinal, text)` are grouped per application into a
//! [`data::DocumentStore`], which feeds a line-per-document training corpus and
//! a growing [`nlp::VocabularySet`], or, given an [`nlp::EmbeddingModel`],
//! per-application vectors written as escaped CSV checkpoints.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod pipeline;

pub use error::{PipelineError, Result};

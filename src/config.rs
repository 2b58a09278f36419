//! Runtime configuration utilities for claim-vectors.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::Deserialize;

use crate::data::shard::ShardLayout;

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder holding the `shards/` input directory.
    pub data_dir: PathBuf,
    /// Root folder for corpus, vocabulary, model and result artefacts.
    pub outputs_dir: PathBuf,
    /// File name prefix of source shards.
    pub shard_prefix: String,
    /// File extension of source shards (`csv`, `tsv` or `parquet`).
    pub shard_ext: String,
    /// Zero padding applied to shard indices in every file name.
    pub shard_width: usize,
    /// Dimension of vectors produced by the built-in model.
    pub vector_dim: usize,
    /// Minimum corpus frequency for a word to enter the model vocabulary.
    pub min_count: usize,
    /// Fraction of entities kept by the corpus pass.
    pub sample_rate: f64,
    /// Seed for sampling and model initialisation.
    pub seed: u64,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let defaults = Self::rooted(&data_dir, &outputs_dir);
        let settings = Self {
            shard_prefix: env::var("SHARD_PREFIX").unwrap_or(defaults.shard_prefix),
            shard_ext: env::var("SHARD_EXT").unwrap_or(defaults.shard_ext),
            shard_width: env_or("SHARD_WIDTH", defaults.shard_width),
            vector_dim: env_or("VECTOR_DIM", defaults.vector_dim),
            min_count: env_or("MIN_COUNT", defaults.min_count),
            sample_rate: env_or("SAMPLE_RATE", defaults.sample_rate),
            seed: env_or("SEED", defaults.seed),
            ..defaults
        };

        std::fs::create_dir_all(&settings.data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&settings.outputs_dir).context("creating outputs dir")?;
        Ok(settings)
    }

    /// Defaults anchored at explicit directories, without touching the environment.
    pub fn rooted(data_dir: impl AsRef<Path>, outputs_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            outputs_dir: outputs_dir.as_ref().to_path_buf(),
            shard_prefix: "claims_".to_string(),
            shard_ext: "csv".to_string(),
            shard_width: 3,
            vector_dim: 100,
            min_count: 2,
            sample_rate: 1.0,
            seed: 42,
        }
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    /// Source shards: `data/shards/{prefix}{index}.{ext}`.
    pub fn shard_layout(&self) -> ShardLayout {
        ShardLayout::new(
            self.join_data("shards"),
            &self.shard_prefix,
            self.shard_width,
            &self.shard_ext,
        )
    }

    /// Per-shard inference results.
    pub fn vector_layout(&self) -> ShardLayout {
        ShardLayout::new(self.join_output("vectors"), "vectors_", self.shard_width, "csv")
    }

    /// Per-shard full checkpoints written by the snapshot pass.
    pub fn checkpoint_layout(&self) -> ShardLayout {
        ShardLayout::new(self.join_output("checkpoints"), "claims_", self.shard_width, "csv")
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.join_output("corpus.txt")
    }

    pub fn corpus_index_path(&self) -> PathBuf {
        self.join_output("corpus_index.csv")
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.join_output("vocab.txt")
    }

    pub fn model_path(&self) -> PathBuf {
        self.join_output("model.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.join_output("manifest.json")
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_share_the_configured_width() {
        let mut settings = Settings::rooted("/data", "/out");
        settings.shard_width = 4;
        assert_eq!(
            settings.shard_layout().path(7),
            PathBuf::from("/data/shards/claims_0007.csv")
        );
        assert_eq!(
            settings.vector_layout().path(12),
            PathBuf::from("/out/vectors/vectors_0012.csv")
        );
        assert_eq!(settings.model_path(), PathBuf::from("/out/model.json"));
    }
}

//! CLI entry-point for training the built-in embedding model.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, nlp::HashedMeanTrainer, nlp::EmbeddingModel, pipeline};

/// Args for the `train` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Override the vector dimension.
    #[arg(long)]
    pub dim: Option<usize>,
    /// Override the minimum word frequency.
    #[arg(long)]
    pub min_count: Option<usize>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let trainer = HashedMeanTrainer {
        dimension: args.dim.unwrap_or(settings.vector_dim),
        min_count: args.min_count.unwrap_or(settings.min_count),
        seed: settings.seed,
    };
    let model = pipeline::train_model(&settings, &trainer).context("train model")?;
    info!(
        words = model.vocabulary().len(),
        path = %settings.model_path().display(),
        "model trained"
    );
    Ok(())
}

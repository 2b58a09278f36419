//! CLI entry-point for the corpus and vocabulary pass.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    cli::{ColumnArgs, RangeArgs},
    config::Settings,
    pipeline::{self, training::CorpusOptions, ShardRange},
};

/// Args for the `corpus` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub range: RangeArgs,
    #[command(flatten)]
    pub columns: ColumnArgs,
    /// Override the fraction of entities kept.
    #[arg(long)]
    pub sample: Option<f64>,
    /// Override the sampling seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let range = ShardRange::resolve(args.range.start, args.range.end, &settings.shard_layout())?;
    let options = CorpusOptions {
        range,
        sample_rate: args.sample.unwrap_or(settings.sample_rate),
        seed: args.seed.unwrap_or(settings.seed),
        columns: args.columns.columns(),
    };
    let summary = pipeline::run_corpus(&settings, &options).context("corpus pass")?;
    info!(
        lines = summary.lines,
        vocabulary = summary.vocabulary,
        corpus = %settings.corpus_path().display(),
        "corpus ready for training"
    );
    Ok(())
}

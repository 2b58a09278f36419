//! CLI entry-point for merging per-shard results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, pipeline};

/// Args for the `collect` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Number of result shards; defaults to the files found on disk.
    #[arg(long)]
    pub shards: Option<usize>,
    /// Destination file; defaults to `vectors.csv` in the outputs directory.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let shards = args
        .shards
        .unwrap_or_else(|| settings.vector_layout().discover_count());
    let output = args
        .output
        .unwrap_or_else(|| settings.join_output("vectors.csv"));
    let entities = pipeline::collect_results(&settings, shards, &output)
        .with_context(|| format!("collect {shards} result shards"))?;
    info!(entities, path = %output.display(), "collected vectors");
    Ok(())
}

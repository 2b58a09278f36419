//! CLI entry-point for full claim checkpoints.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{
    cli::{ColumnArgs, RangeArgs},
    config::Settings,
    pipeline::{self, ShardRange},
};

/// Args for the `snapshot` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub range: RangeArgs,
    #[command(flatten)]
    pub columns: ColumnArgs,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let range = ShardRange::resolve(args.range.start, args.range.end, &settings.shard_layout())?;
    pipeline::run_snapshot(&settings, range, &args.columns.columns()).context("snapshot pass")?;
    Ok(())
}

//! Command-line interface wiring for claim-vectors.

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::{
    config::Settings,
    data::shard::{ColumnRef, ShardColumns},
};

pub mod collect;
pub mod corpus;
pub mod infer;
pub mod snapshot;
pub mod train;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Patent claim corpus and vector pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Corpus(args) => corpus::run(args, settings).await,
            Commands::Train(args) => train::run(args, settings).await,
            Commands::Infer(args) => infer::run(args, settings).await,
            Commands::Snapshot(args) => snapshot::run(args, settings).await,
            Commands::Collect(args) => collect::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the training corpus and vocabulary from source shards.
    Corpus(corpus::Args),
    /// Train the built-in embedding model on the corpus.
    Train(train::Args),
    /// Assign vectors to every entity, one result file per shard.
    Infer(infer::Args),
    /// Write full claim checkpoints for source shards.
    Snapshot(snapshot::Args),
    /// Merge per-shard results into a single file.
    Collect(collect::Args),
}

/// Embedding backend used by `infer`.
#[derive(Clone, Debug, ValueEnum)]
pub enum Backend {
    /// Deterministic hashed word vectors trained by `train`.
    Hashed,
    /// fastembed sentence model (requires the `embeddings` feature).
    Fastembed,
}

/// Shard range shared by the shard-iterating commands.
#[derive(Debug, Clone, ClapArgs)]
pub struct RangeArgs {
    /// First shard index to process.
    #[arg(long, default_value_t = 0)]
    pub start: usize,
    /// One past the last shard index; defaults to the shards found on disk.
    #[arg(long)]
    pub end: Option<usize>,
}

/// Source column selection; numbers are positions, anything else a header name.
#[derive(Debug, Clone, ClapArgs)]
pub struct ColumnArgs {
    #[arg(long, default_value = "0")]
    pub id_column: String,
    #[arg(long, default_value = "1")]
    pub order_column: String,
    #[arg(long, default_value = "2")]
    pub text_column: String,
}

impl ColumnArgs {
    pub fn columns(&self) -> ShardColumns {
        ShardColumns {
            id: column_ref(&self.id_column),
            order: column_ref(&self.order_column),
            text: column_ref(&self.text_column),
        }
    }
}

fn column_ref(raw: &str) -> ColumnRef {
    raw.parse::<usize>()
        .map(ColumnRef::Index)
        .unwrap_or_else(|_| ColumnRef::Name(raw.to_string()))
}

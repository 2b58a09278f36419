//! CLI entry-point for vector inference.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    cli::{Backend, ColumnArgs, RangeArgs},
    config::Settings,
    nlp::{EmbeddingModel, HashedMeanModel},
    pipeline::{self, Mode, RunManifest, ShardRange},
};

/// Args for the `infer` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    #[command(flatten)]
    pub range: RangeArgs,
    #[command(flatten)]
    pub columns: ColumnArgs,
    /// Continue after the last shard recorded in the run manifest.
    #[arg(long, conflicts_with = "start")]
    pub resume: bool,
    /// Embedding backend.
    #[arg(long, default_value = "hashed", value_enum)]
    pub backend: Backend,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let start = if args.resume {
        let manifest = RunManifest::load_or_default(&settings.manifest_path())?;
        manifest.next_shard(Mode::Inference)
    } else {
        args.range.start
    };
    let range = ShardRange::resolve(start, args.range.end, &settings.shard_layout())?;
    let model = load_model(&args.backend, &settings)?;
    let summary = pipeline::run_inference(&settings, model.as_ref(), range, &args.columns.columns())
        .context("inference pass")?;
    info!(
        entities = summary.entities,
        results = %settings.vector_layout().dir.display(),
        "vectors written"
    );
    Ok(())
}

fn load_model(backend: &Backend, settings: &Settings) -> Result<Box<dyn EmbeddingModel>> {
    match backend {
        Backend::Hashed => {
            let path = settings.model_path();
            let model = HashedMeanModel::load(&path)
                .with_context(|| format!("load model {}; run train first", path.display()))?;
            Ok(Box::new(model))
        }
        #[cfg(feature = "embeddings")]
        Backend::Fastembed => {
            use crate::nlp::{embeddings::FastEmbedModel, VocabularySet};
            let vocabulary = VocabularySet::from_file(&settings.vocab_path())
                .context("load vocabulary; run corpus first")?;
            Ok(Box::new(FastEmbedModel::try_new(vocabulary)?))
        }
        #[cfg(not(feature = "embeddings"))]
        Backend::Fastembed => anyhow::bail!("fastembed backend requires the `embeddings` feature"),
    }
}

//! Vector assignment pass and result collection.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    config::Settings,
    data::{
        checkpoint::{self, CheckpointForm},
        shard::{self, ShardColumns},
        store::DocumentStore,
    },
    error::Result,
    nlp::model::EmbeddingModel,
    pipeline::{
        manifest::{record_completion, Mode},
        require_shard, ShardRange,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceSummary {
    pub shards: usize,
    pub entities: usize,
    /// Entities whose every token was outside the model vocabulary.
    pub empty_documents: usize,
}

/// Assign vectors shard by shard, writing one vector-only result file per shard.
///
/// Only indices inside `range` are touched; result files of earlier shards are
/// never opened.
pub fn run_inference<M>(
    settings: &Settings,
    model: &M,
    range: ShardRange,
    columns: &ShardColumns,
) -> Result<InferenceSummary>
where
    M: EmbeddingModel + ?Sized,
{
    let source = settings.shard_layout();
    let target = settings.vector_layout();
    let manifest_path = settings.manifest_path();
    let mut summary = InferenceSummary::default();
    let mut store = DocumentStore::new();

    info!(
        start = range.start,
        end = range.end,
        dimension = model.dimension(),
        vocabulary = model.vocabulary().len(),
        "starting inference pass"
    );
    for index in range.indices() {
        let path = require_shard(&source, index)?;
        shard::feed(shard::load(&path, columns)?, &mut store, None, None);
        store.assign_all_vectors(model)?;
        store.compute_all_word_counts();

        let out_path = target.path(index);
        checkpoint::write_checkpoint(&store, &out_path, CheckpointForm::Vectors)?;
        record_completion(&manifest_path, Mode::Inference, index, None)?;

        let empty = store
            .iter()
            .filter(|(_, doc)| doc.word_count == Some(0))
            .count();
        summary.shards += 1;
        summary.entities += store.len();
        summary.empty_documents += empty;
        info!(shard = index, entities = store.len(), empty, "inference shard flushed");
        store.reset();
    }
    info!(?summary, "inference pass finished");
    Ok(summary)
}

/// Merge `shard_count` result files into one `id,word_count,vector` file.
pub fn collect_results(settings: &Settings, shard_count: usize, output: &Path) -> Result<usize> {
    let store = checkpoint::read_checkpoint(&settings.vector_layout(), shard_count)?;
    checkpoint::write_checkpoint(&store, output, CheckpointForm::Vectors)?;
    debug!(path = %output.display(), "collected results");
    Ok(store.len())
}

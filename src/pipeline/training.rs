//! Corpus and vocabulary pass, full-checkpoint snapshots and model training.

use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader},
    path::Path,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, warn};

use crate::{
    config::Settings,
    data::{
        checkpoint::{self, CheckpointForm},
        shard::{self, ShardColumns},
        store::DocumentStore,
    },
    error::{PipelineError, Result},
    nlp::{
        model::{HashedMeanModel, ModelTrainer},
        vocab::VocabularySet,
    },
    pipeline::{
        manifest::{record_completion, CorpusOffsets, Mode, RunManifest},
        require_shard, ShardRange,
    },
};

/// Knobs for the corpus pass.
#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub range: ShardRange,
    /// Probability of keeping an entity; `1.0` keeps everything.
    pub sample_rate: f64,
    pub seed: u64,
    pub columns: ShardColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    pub shards: usize,
    pub entities: usize,
    pub tokens: usize,
    pub lines: usize,
    pub vocabulary: usize,
}

/// Build the corpus, corpus index and vocabulary shard by shard.
///
/// Starting at shard 0 truncates every artefact. Starting later reloads the
/// vocabulary and appends; if the manifest says exactly that shard is next,
/// the corpus files are first cut back to their size at the last completed
/// shard so a half-written shard is not duplicated.
pub fn run_corpus(settings: &Settings, options: &CorpusOptions) -> Result<CorpusSummary> {
    if !(0.0..=1.0).contains(&options.sample_rate) {
        return Err(PipelineError::InvalidConfig(format!(
            "sample rate {} must be within [0, 1]",
            options.sample_rate
        )));
    }
    let layout = settings.shard_layout();
    let corpus_path = settings.corpus_path();
    let index_path = settings.corpus_index_path();
    let vocab_path = settings.vocab_path();
    let manifest_path = settings.manifest_path();
    std::fs::create_dir_all(&settings.outputs_dir)
        .map_err(|err| PipelineError::io(err, &settings.outputs_dir))?;

    let mut vocab = VocabularySet::new();
    let mut lines = if options.range.start == 0 {
        let mut manifest = RunManifest::load_or_default(&manifest_path)?;
        manifest.clear(Mode::Corpus);
        manifest.save(&manifest_path)?;
        0
    } else {
        if vocab_path.exists() {
            vocab.load(&vocab_path)?;
        } else {
            warn!(
                start = options.range.start,
                path = %vocab_path.display(),
                "no saved vocabulary to resume from; earlier shards' words will be missing"
            );
        }
        resume_offsets(settings, options.range.start)?
    };

    let mut summary = CorpusSummary::default();
    let mut store = DocumentStore::new();
    for index in options.range.indices() {
        let path = require_shard(&layout, index)?;
        let grouped = shard::load(&path, &options.columns)?;

        let mut sampler = sampler(options.sample_rate, options.seed, index);
        shard::feed(
            grouped,
            &mut store,
            Some(&mut vocab),
            sampler.as_mut().map(|f| f as &mut dyn FnMut() -> bool),
        );
        store.compute_all_word_counts();

        let append = !(index == options.range.start && options.range.start == 0);
        let written = checkpoint::write_corpus(&store, &corpus_path, append)?;
        checkpoint::write_corpus_index(&store, &index_path, lines, index, append)?;
        vocab.save(&vocab_path, false)?;
        lines += written;

        let offsets = CorpusOffsets {
            lines,
            corpus_bytes: file_len(&corpus_path)?,
            index_bytes: file_len(&index_path)?,
        };
        record_completion(&manifest_path, Mode::Corpus, index, Some(offsets))?;

        summary.shards += 1;
        summary.entities += store.len();
        summary.tokens += store.total_tokens();
        info!(
            shard = index,
            entities = store.len(),
            tokens = store.total_tokens(),
            vocabulary = vocab.len(),
            "corpus shard flushed"
        );
        store.reset();
    }
    summary.lines = lines;
    summary.vocabulary = vocab.len();
    info!(?summary, "corpus pass finished");
    Ok(summary)
}

/// Write a full checkpoint (claims and token counts) for each source shard.
pub fn run_snapshot(settings: &Settings, range: ShardRange, columns: &ShardColumns) -> Result<usize> {
    let source = settings.shard_layout();
    let target = settings.checkpoint_layout();
    let manifest_path = settings.manifest_path();
    let mut store = DocumentStore::new();
    let mut entities = 0usize;
    for index in range.indices() {
        let path = require_shard(&source, index)?;
        shard::feed(shard::load(&path, columns)?, &mut store, None, None);
        store.compute_all_word_counts();
        checkpoint::write_checkpoint(&store, &target.path(index), CheckpointForm::Full)?;
        record_completion(&manifest_path, Mode::Snapshot, index, None)?;
        entities += store.len();
        store.reset();
    }
    info!(shards = range.len(), entities, "snapshot pass finished");
    Ok(entities)
}

/// Hand the finished corpus to the trainer and persist the resulting model.
pub fn train_model<T>(settings: &Settings, trainer: &T) -> Result<HashedMeanModel>
where
    T: ModelTrainer<Model = HashedMeanModel>,
{
    let corpus_path = settings.corpus_path();
    if !corpus_path.exists() {
        return Err(PipelineError::InvalidConfig(format!(
            "corpus {} missing; run the corpus pass first",
            corpus_path.display()
        )));
    }
    let model = trainer.train(&corpus_path)?;
    model.save(&settings.model_path())?;
    Ok(model)
}

/// Per-shard sampling predicate, seeded so a resumed run samples identically.
fn sampler(rate: f64, seed: u64, shard: usize) -> Option<impl FnMut() -> bool> {
    if rate >= 1.0 {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed ^ (shard as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    Some(move || rng.gen_bool(rate))
}

/// Line count to continue from, trimming a partially appended shard when possible.
fn resume_offsets(settings: &Settings, start: usize) -> Result<usize> {
    let corpus_path = settings.corpus_path();
    let index_path = settings.corpus_index_path();
    let manifest = RunManifest::load_or_default(&settings.manifest_path())?;
    let recorded = manifest
        .progress(Mode::Corpus)
        .filter(|p| p.next_shard == start)
        .and_then(|p| p.offsets);
    if let Some(offsets) = recorded {
        truncate_to(&corpus_path, offsets.corpus_bytes)?;
        truncate_to(&index_path, offsets.index_bytes)?;
        info!(start, lines = offsets.lines, "resuming corpus pass");
        return Ok(offsets.lines);
    }
    warn!(
        start,
        next = manifest.next_shard(Mode::Corpus),
        "corpus manifest does not match resume point; appending to existing files"
    );
    count_lines(&corpus_path)
}

fn truncate_to(path: &Path, len: u64) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|err| PipelineError::io(err, path))?;
    file.set_len(len).map_err(|err| PipelineError::io(err, path))
}

fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let file = std::fs::File::open(path).map_err(|err| PipelineError::io(err, path))?;
    let mut count = 0usize;
    for line in BufReader::new(file).lines() {
        line.map_err(|err| PipelineError::io(err, path))?;
        count += 1;
    }
    Ok(count)
}

fn file_len(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|err| PipelineError::io(err, path))
}

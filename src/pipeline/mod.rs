//! Shard-sequential drivers for the corpus, snapshot and inference passes.
//!
//! Every pass owns one [`DocumentStore`](crate::data::DocumentStore), fills it
//! from a single shard, flushes that shard's output and resets the store before
//! the next index. A crash therefore loses at most the shard in flight.

pub mod inference;
pub mod manifest;
pub mod training;

use crate::{
    data::shard::ShardLayout,
    error::{PipelineError, Result},
};

pub use inference::{collect_results, run_inference, InferenceSummary};
pub use manifest::{Mode, RunManifest};
pub use training::{run_corpus, run_snapshot, train_model, CorpusSummary};

/// Half-open range of shard indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRange {
    pub start: usize,
    pub end: usize,
}

impl ShardRange {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidConfig(format!(
                "shard range start {start} is past end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolve an open-ended range against the shards present on disk.
    pub fn resolve(start: usize, end: Option<usize>, layout: &ShardLayout) -> Result<Self> {
        let end = end.unwrap_or_else(|| layout.discover_count());
        Self::new(start, end)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Fail fast with the shard index when a source file is absent.
pub(crate) fn require_shard(layout: &ShardLayout, index: usize) -> Result<std::path::PathBuf> {
    let path = layout.path(index);
    if path.exists() {
        Ok(path)
    } else {
        Err(PipelineError::MissingShard { index, path })
    }
}

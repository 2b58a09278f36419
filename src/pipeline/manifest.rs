//! Progress record written after every flushed shard.

use std::{fs::File, io::BufReader, path::Path};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Which pass a manifest entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Corpus,
    Inference,
    Snapshot,
}

/// Sizes of the append-only corpus files after the last completed shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusOffsets {
    pub lines: usize,
    pub corpus_bytes: u64,
    pub index_bytes: u64,
}

/// Completed shards for one mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub next_shard: usize,
    pub completed: Vec<usize>,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsets: Option<CorpusOffsets>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default)]
    pub corpus: Option<Progress>,
    #[serde(default)]
    pub inference: Option<Progress>,
    #[serde(default)]
    pub snapshot: Option<Progress>,
}

impl RunManifest {
    /// Read the manifest, or start a fresh one when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path).map_err(|err| PipelineError::io(err, path))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, payload).map_err(|err| PipelineError::io(err, &tmp))?;
        std::fs::rename(&tmp, path).map_err(|err| PipelineError::io(err, path))?;
        Ok(())
    }

    pub fn progress(&self, mode: Mode) -> Option<&Progress> {
        match mode {
            Mode::Corpus => self.corpus.as_ref(),
            Mode::Inference => self.inference.as_ref(),
            Mode::Snapshot => self.snapshot.as_ref(),
        }
    }

    /// First shard a resumed run of `mode` should process.
    pub fn next_shard(&self, mode: Mode) -> usize {
        self.progress(mode).map_or(0, |p| p.next_shard)
    }

    /// Mark `shard` done for `mode`.
    pub fn complete(&mut self, mode: Mode, shard: usize, offsets: Option<CorpusOffsets>) {
        let slot = match mode {
            Mode::Corpus => &mut self.corpus,
            Mode::Inference => &mut self.inference,
            Mode::Snapshot => &mut self.snapshot,
        };
        let progress = slot.get_or_insert_with(Progress::default);
        if !progress.completed.contains(&shard) {
            progress.completed.push(shard);
        }
        progress.next_shard = shard + 1;
        progress.updated_at = Utc::now().to_rfc3339();
        if offsets.is_some() {
            progress.offsets = offsets;
        }
    }

    /// Forget progress for `mode`, used when a pass restarts from shard 0.
    pub fn clear(&mut self, mode: Mode) {
        match mode {
            Mode::Corpus => self.corpus = None,
            Mode::Inference => self.inference = None,
            Mode::Snapshot => self.snapshot = None,
        }
    }
}

/// Load, update and persist the manifest in one step.
pub fn record_completion(
    path: &Path,
    mode: Mode,
    shard: usize,
    offsets: Option<CorpusOffsets>,
) -> Result<()> {
    let mut manifest = RunManifest::load_or_default(path)?;
    manifest.complete(mode, shard, offsets);
    manifest.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn completion_advances_next_shard() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("manifest.json");
        record_completion(&path, Mode::Inference, 0, None).expect("record");
        record_completion(&path, Mode::Inference, 1, None).expect("record");

        let manifest = RunManifest::load_or_default(&path).expect("load");
        assert_eq!(manifest.next_shard(Mode::Inference), 2);
        assert_eq!(manifest.next_shard(Mode::Corpus), 0);
        assert_eq!(manifest.progress(Mode::Inference).unwrap().completed, vec![0, 1]);
    }

    #[test]
    fn offsets_survive_later_updates() {
        let mut manifest = RunManifest::default();
        let offsets = CorpusOffsets {
            lines: 3,
            corpus_bytes: 40,
            index_bytes: 60,
        };
        manifest.complete(Mode::Corpus, 0, Some(offsets));
        manifest.complete(Mode::Corpus, 1, None);
        let progress = manifest.progress(Mode::Corpus).unwrap();
        assert_eq!(progress.offsets, Some(offsets));
        assert_eq!(progress.next_shard, 2);
    }
}

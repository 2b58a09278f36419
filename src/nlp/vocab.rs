//! Process-wide vocabulary accumulated across shards.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use indexmap::IndexSet;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Tokens that never enter the vocabulary.
const EXCLUDED: [&str; 2] = ["", " "];

/// Append-only set of unique normalized tokens.
///
/// Iteration follows first-insertion order so persisted files are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularySet {
    words: IndexSet<String>,
}

impl VocabularySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `tokens` into the set, dropping the empty and single-space tokens.
    pub fn add<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            let token = token.into();
            if EXCLUDED.contains(&token.as_str()) {
                continue;
            }
            self.words.insert(token);
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Write one token per line, appending to or replacing `path`.
    ///
    /// A replacing save goes through a sibling temp file and a rename, so an
    /// interrupted write leaves the previous vocabulary intact.
    pub fn save(&self, path: &Path, append: bool) -> Result<()> {
        if append {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| PipelineError::io(err, path))?;
            self.write_words(file, path)?;
        } else {
            let tmp = path.with_extension("txt.tmp");
            let file = File::create(&tmp).map_err(|err| PipelineError::io(err, &tmp))?;
            self.write_words(file, &tmp)?;
            std::fs::rename(&tmp, path).map_err(|err| PipelineError::io(err, path))?;
        }
        debug!(path = %path.display(), words = self.words.len(), append, "saved vocabulary");
        Ok(())
    }

    fn write_words(&self, file: File, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(file);
        for word in &self.words {
            writeln!(writer, "{word}").map_err(|err| PipelineError::io(err, path))?;
        }
        writer.flush().map_err(|err| PipelineError::io(err, path))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|err| PipelineError::io(err, path))
    }

    /// Merge every line of `path` into the set.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).map_err(|err| PipelineError::io(err, path))?;
        let before = self.words.len();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|err| PipelineError::io(err, path))?;
            self.add([line]);
        }
        debug!(
            path = %path.display(),
            added = self.words.len() - before,
            "loaded vocabulary"
        );
        Ok(())
    }

    /// Build a set from a file, as used when reopening a persisted vocabulary.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut vocab = Self::new();
        vocab.load(path)?;
        Ok(vocab)
    }
}

impl<S: Into<String>> FromIterator<S> for VocabularySet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut vocab = Self::new();
        vocab.add(iter);
        vocab
    }
}

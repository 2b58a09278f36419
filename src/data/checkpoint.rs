//! Corpus and checkpoint persistence for a [`DocumentStore`].

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::Path,
};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info};

use crate::{
    data::{
        escape::{decode_fragments, decode_vector, encode_fragments, encode_vector},
        shard::ShardLayout,
        store::{Document, DocumentStore, EntityId},
    },
    error::{PipelineError, Result},
};

pub const FULL_HEADER: [&str; 5] = ["id", "claims", "vector", "word_count", "token_count"];
pub const VECTOR_HEADER: [&str; 3] = ["id", "word_count", "vector"];

/// Which columns a checkpoint carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointForm {
    /// Raw claims, vector and both counts.
    Full,
    /// Only id, filtered word count and vector.
    Vectors,
}

/// Write one corpus line per entity in store order. Returns the number of lines.
pub fn write_corpus(store: &DocumentStore, path: &Path, append: bool) -> Result<usize> {
    let mut writer = open_text(path, append)?;
    for entity_id in store.entity_ids() {
        writeln!(writer, "{}", store.sentence_for(entity_id))
            .map_err(|err| PipelineError::io(err, path))?;
    }
    writer.flush().map_err(|err| PipelineError::io(err, path))?;
    debug!(path = %path.display(), lines = store.len(), append, "wrote corpus lines");
    Ok(store.len())
}

/// Record which corpus line belongs to which entity.
///
/// `first_line` is the zero-based corpus line of the store's first entity.
pub fn write_corpus_index(
    store: &DocumentStore,
    path: &Path,
    first_line: usize,
    shard: usize,
    append: bool,
) -> Result<()> {
    let needs_header =
        !append || std::fs::metadata(path).map_or(true, |meta| meta.len() == 0);
    let file = open_file(path, append)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(["line", "entity_id", "shard"])?;
    }
    for (offset, entity_id) in store.entity_ids().into_iter().enumerate() {
        writer.write_record([
            (first_line + offset).to_string(),
            entity_id.to_string(),
            shard.to_string(),
        ])?;
    }
    writer.flush().map_err(|err| PipelineError::io(err, path))?;
    Ok(())
}

/// Write a header and one escaped row per entity, truncating `path`.
pub fn write_checkpoint(store: &DocumentStore, path: &Path, form: CheckpointForm) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| PipelineError::io(err, parent))?;
    }
    let header = match form {
        CheckpointForm::Full => FULL_HEADER.as_slice(),
        CheckpointForm::Vectors => VECTOR_HEADER.as_slice(),
    };
    let mut file = open_text(path, false)?;
    writeln!(file, "{}", header.join(",")).map_err(|err| PipelineError::io(err, path))?;
    // Bare header, then every list literal wrapped in double quotes.
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(file);
    for (entity_id, doc) in store.iter() {
        let vector = doc.vector.as_deref().map(encode_vector).unwrap_or_default();
        let word_count = optional(doc.word_count);
        match form {
            CheckpointForm::Full => writer.write_record([
                entity_id.to_string(),
                encode_fragments(&doc.fragments),
                vector,
                word_count,
                optional(doc.token_count),
            ])?,
            CheckpointForm::Vectors => {
                writer.write_record([entity_id.to_string(), word_count, vector])?
            }
        }
    }
    writer.flush().map_err(|err| PipelineError::io(err, path))?;
    info!(path = %path.display(), rows = store.len(), ?form, "wrote checkpoint");
    Ok(())
}

/// Rebuild a store from one checkpoint file of either form.
pub fn read_checkpoint_file(path: &Path) -> Result<DocumentStore> {
    let mut store = DocumentStore::new();
    read_checkpoint_into(path, &mut store)?;
    Ok(store)
}

/// Read shards `0..shard_count` of `layout` into a single store.
///
/// An entity present in several files has its fragments appended in shard order.
pub fn read_checkpoint(layout: &ShardLayout, shard_count: usize) -> Result<DocumentStore> {
    let mut store = DocumentStore::new();
    for index in 0..shard_count {
        let path = layout.path(index);
        if !path.exists() {
            return Err(PipelineError::MissingShard { index, path });
        }
        read_checkpoint_into(&path, &mut store)?;
    }
    info!(shards = shard_count, entities = store.len(), "read checkpoints");
    Ok(store)
}

fn read_checkpoint_into(path: &Path, store: &mut DocumentStore) -> Result<()> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = CheckpointColumns::resolve(&headers, path)?;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let malformed = |reason: String| PipelineError::MalformedCheckpoint {
            path: path.to_path_buf(),
            line,
            reason,
        };
        let (entity_id, document) = columns.parse(&record).map_err(malformed)?;
        store.merge(entity_id, document);
    }
    Ok(())
}

struct CheckpointColumns {
    id: usize,
    claims: Option<usize>,
    vector: usize,
    word_count: usize,
    token_count: Option<usize>,
}

impl CheckpointColumns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
        };
        Ok(Self {
            id: require("id")?,
            claims: find("claims"),
            vector: require("vector")?,
            word_count: require("word_count")?,
            token_count: find("token_count"),
        })
    }

    fn parse(&self, record: &StringRecord) -> std::result::Result<(EntityId, Document), String> {
        let field = |idx: usize| record.get(idx).unwrap_or_default();
        let raw_id = field(self.id).trim();
        let entity_id = raw_id
            .parse::<EntityId>()
            .map_err(|_| format!("entity id {raw_id:?} is not an integer"))?;
        let fragments = match self.claims {
            Some(idx) => decode_fragments(field(idx)).map_err(|err| format!("claims: {err}"))?,
            None => Vec::new(),
        };
        let vector = match field(self.vector).trim() {
            "" => None,
            raw => Some(decode_vector(raw).map_err(|err| format!("vector: {err}"))?),
        };
        let word_count =
            parse_count(field(self.word_count)).map_err(|err| format!("word_count: {err}"))?;
        let token_count = match self.token_count {
            Some(idx) => parse_count(field(idx)).map_err(|err| format!("token_count: {err}"))?,
            None => None,
        };
        Ok((
            entity_id,
            Document {
                fragments,
                vector,
                word_count,
                token_count,
            },
        ))
    }
}

fn parse_count(raw: &str) -> std::result::Result<Option<usize>, String> {
    match raw.trim() {
        "" => Ok(None),
        value => value
            .parse()
            .map(Some)
            .map_err(|_| format!("{value:?} is not a count")),
    }
}

fn optional(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn open_file(path: &Path, append: bool) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| PipelineError::io(err, parent))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|err| PipelineError::io(err, path))
}

fn open_text(path: &Path, append: bool) -> Result<BufWriter<std::fs::File>> {
    open_file(path, append).map(BufWriter::new)
}

//! Shard discovery, row loading and per-entity grouping.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use polars::prelude::{DataType, ParquetReader, SerReader, Series};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    data::store::{DocumentStore, EntityId, Fragment},
    error::{PipelineError, Result},
    nlp::vocab::VocabularySet,
};

/// File naming template `{dir}/{prefix}{index:0width}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    pub dir: PathBuf,
    pub prefix: String,
    pub width: usize,
    pub ext: String,
}

impl ShardLayout {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str, width: usize, ext: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
            width,
            ext: ext.to_string(),
        }
    }

    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.ext,
            width = self.width
        )
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(self.file_name(index))
    }

    /// Parse the shard index out of a file name following this layout.
    pub fn index_of(&self, file_name: &str) -> Option<usize> {
        let digits = file_name
            .strip_prefix(&self.prefix)?
            .strip_suffix(&self.ext)?
            .strip_suffix('.')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// One past the highest shard index present on disk, or 0 when none exist.
    pub fn discover_count(&self) -> usize {
        if !self.dir.exists() {
            return 0;
        }
        WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.file_name().to_str().and_then(|n| self.index_of(n)))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Column selector: header name or zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// Which columns carry the entity id, the ordering key and the claim text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardColumns {
    pub id: ColumnRef,
    pub order: ColumnRef,
    pub text: ColumnRef,
}

impl Default for ShardColumns {
    fn default() -> Self {
        Self {
            id: ColumnRef::Index(0),
            order: ColumnRef::Index(1),
            text: ColumnRef::Index(2),
        }
    }
}

/// One source row before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub entity_id: EntityId,
    pub ordinal: i64,
    pub text: Fragment,
}

/// Ordered fragments per entity, entities in first-appearance order.
pub type GroupedShard = IndexMap<EntityId, Vec<Fragment>>;

/// Group rows by entity and order each group by ascending ordinal.
///
/// The sort is stable, so rows sharing an ordinal keep their file order.
pub fn group_rows(rows: Vec<RawRow>) -> GroupedShard {
    let mut groups: IndexMap<EntityId, Vec<(i64, Fragment)>> = IndexMap::new();
    for row in rows {
        groups
            .entry(row.entity_id)
            .or_default()
            .push((row.ordinal, row.text));
    }
    groups
        .into_iter()
        .map(|(id, mut items)| {
            items.sort_by_key(|(ordinal, _)| *ordinal);
            (id, items.into_iter().map(|(_, text)| text).collect())
        })
        .collect()
}

/// Read every row of a CSV/TSV or Parquet shard.
pub fn read_rows(path: &Path, columns: &ShardColumns) -> Result<Vec<RawRow>> {
    if !path.exists() {
        return Err(PipelineError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "shard file not found"),
            path,
        ));
    }
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    let rows = match ext.as_deref() {
        Some("parquet") => read_parquet_rows(path, columns)?,
        Some("tsv") => read_delimited_rows(path, columns, b'\t')?,
        _ => read_delimited_rows(path, columns, b',')?,
    };
    debug!(path = %path.display(), rows = rows.len(), "read shard rows");
    Ok(rows)
}

/// Read and group one shard.
pub fn load(path: &Path, columns: &ShardColumns) -> Result<GroupedShard> {
    let grouped = group_rows(read_rows(path, columns)?);
    info!(path = %path.display(), entities = grouped.len(), "loaded shard");
    Ok(grouped)
}

/// Push every grouped entity into the store.
pub fn feed(
    grouped: GroupedShard,
    store: &mut DocumentStore,
    mut vocab: Option<&mut VocabularySet>,
    mut sample: Option<&mut dyn FnMut() -> bool>,
) {
    for (entity_id, fragments) in grouped {
        store.add(
            entity_id,
            fragments,
            vocab.as_deref_mut(),
            sample.as_mut().map(|f| &mut **f as &mut dyn FnMut() -> bool),
        );
    }
}

fn read_delimited_rows(
    path: &Path,
    columns: &ShardColumns,
    delimiter: u8,
) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |column: &ColumnRef| -> Result<usize> {
        match column {
            ColumnRef::Index(idx) if *idx < headers.len() => Ok(*idx),
            ColumnRef::Name(name) => headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| missing(column, path)),
            ColumnRef::Index(_) => Err(missing(column, path)),
        }
    };
    let id_idx = position(&columns.id)?;
    let order_idx = position(&columns.order)?;
    let text_idx = position(&columns.text)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let invalid = |reason: String| PipelineError::InvalidRow {
            path: path.to_path_buf(),
            line,
            reason,
        };
        let raw_id = record.get(id_idx).unwrap_or_default().trim();
        let entity_id = raw_id
            .parse::<EntityId>()
            .map_err(|_| invalid(format!("entity id {raw_id:?} is not an integer")))?;
        let raw_order = record.get(order_idx).unwrap_or_default();
        let ordinal = parse_ordinal(raw_order)
            .ok_or_else(|| invalid(format!("ordering key {raw_order:?} is not numeric")))?;
        let text = record
            .get(text_idx)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        rows.push(RawRow {
            entity_id,
            ordinal,
            text,
        });
    }
    Ok(rows)
}

fn read_parquet_rows(path: &Path, columns: &ShardColumns) -> Result<Vec<RawRow>> {
    let file = File::open(path).map_err(|err| PipelineError::io(err, path))?;
    let df = ParquetReader::new(file).finish()?;
    let select = |column: &ColumnRef| -> Result<Series> {
        let series = match column {
            ColumnRef::Name(name) => df.column(name).ok(),
            ColumnRef::Index(idx) => df.select_at_idx(*idx),
        };
        series.cloned().ok_or_else(|| missing(column, path))
    };
    let raw_ids = select(&columns.id)?;
    let raw_orders = select(&columns.order)?;
    let ids = raw_ids.cast(&DataType::Int64)?;
    let orders = raw_orders.cast(&DataType::Float64)?;
    let texts = select(&columns.text)?.cast(&DataType::String)?;
    let (id_nulls, order_nulls) = (raw_ids.is_null(), raw_orders.is_null());
    let ids = ids.i64()?;
    let orders = orders.f64()?;
    let texts = texts.str()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for idx in 0..df.height() {
        // A cast only yields null for a present cell when the value is unparseable.
        let invalid = |what: &str, column: &ColumnRef| PipelineError::InvalidRow {
            path: path.to_path_buf(),
            line: idx as u64 + 1,
            reason: format!("{what} in column {column} is not numeric"),
        };
        let entity_id = match ids.get(idx) {
            Some(id) => Some(id),
            None if id_nulls.get(idx) == Some(false) => {
                return Err(invalid("entity id", &columns.id))
            }
            None => None,
        };
        let ordinal = match orders.get(idx).filter(|v| v.is_finite()) {
            Some(ordinal) => Some(ordinal),
            None if order_nulls.get(idx) == Some(false) => {
                return Err(invalid("ordering key", &columns.order))
            }
            None => None,
        };
        let (Some(entity_id), Some(ordinal)) = (entity_id, ordinal) else {
            skipped += 1;
            continue;
        };
        rows.push(RawRow {
            entity_id,
            ordinal: ordinal as i64,
            text: texts.get(idx).map(str::to_string),
        });
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "dropped parquet rows with null id or ordering key");
    }
    Ok(rows)
}

/// Ordering keys may arrive as text such as `"3"` or `"3.0"`.
fn parse_ordinal(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
}

fn missing(column: &ColumnRef, path: &Path) -> PipelineError {
    PipelineError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    }
}

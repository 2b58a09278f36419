//! Error types shared by the library modules.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the library.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Failures raised while loading shards, persisting artefacts or running a model.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem IO error with the path being processed.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A checkpoint row could not be decoded; the whole shard is rejected.
    #[error("malformed checkpoint {path:?} at line {line}: {reason}")]
    MalformedCheckpoint {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    /// A source row carried an id or ordering key that is not numeric.
    #[error("invalid row in {path:?} at line {line}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("column {column} not found in {path:?}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("shard {index} missing at {path:?}")]
    MissingShard { index: usize, path: PathBuf },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Error bubbled up from an embedding model backend.
    #[error("embedding model error: {0}")]
    Model(String),
}

impl PipelineError {
    /// Helper constructor attaching the path to an IO error.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

//! Shard ingestion, the document accumulator and its persisted forms.

pub mod checkpoint;
pub mod escape;
pub mod shard;
pub mod store;

pub use checkpoint::CheckpointForm;
pub use shard::{ColumnRef, ShardColumns, ShardLayout};
pub use store::{Document, DocumentStore, EntityId, Fragment};

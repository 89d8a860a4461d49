//! Persisted record types
//!
//! The document shapes this layer reads and writes. Primary keys never
//! appear inside a document body; they live in the store's id column.

mod profile;
mod task;

pub use profile::{BlobKind, UserDoc, UserProfile};
pub use task::{IncompleteTask, RecoveredTask, RecoveryGroups, UNKNOWN_SOURCE, UNTAGGED};

/// Flat option-name to value mapping (bot config, downloader options,
/// deploy snapshots)
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// A user's feed definitions, opaque to this layer
pub type FeedMap = serde_json::Map<String, serde_json::Value>;

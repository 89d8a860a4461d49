//! In-flight task records
//!
//! A ledger row is written when a job starts and deleted when it finishes.
//! Whatever survives until the next startup is the crash-recovery signal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grouping key for recovered tasks whose row carried no tag
pub const UNTAGGED: &str = "untagged";

/// Source description for recovered tasks whose row carried none
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// A ledger row for a job that is (or was) in flight
///
/// The job link is the document id and is not repeated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteTask {
    /// Owning chat id
    pub cid: i64,

    /// Grouping tag for re-notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Human-readable source description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Reference to the message that triggered the job, opaque to this layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Value>,
}

impl IncompleteTask {
    /// Create a row with the optional fields unset
    pub fn new(cid: i64) -> Self {
        Self {
            cid,
            tag: None,
            source: None,
            origin: None,
        }
    }

    /// Set the grouping tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the source description
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the originating message reference
    pub fn with_origin(mut self, origin: Value) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// One task surfaced by a ledger drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredTask {
    /// The job link (ledger primary key)
    pub link: String,
    /// Source description, defaulted when the row carried none
    pub source: String,
}

/// Drained ledger rows grouped chat id -> tag -> tasks in discovery order
pub type RecoveryGroups = HashMap<i64, HashMap<String, Vec<RecoveredTask>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_default_on_read() {
        // A row written before tags existed only carries the chat id
        let task: IncompleteTask = serde_json::from_value(json!({"cid": 99})).unwrap();
        assert_eq!(task.cid, 99);
        assert!(task.tag.is_none());
        assert!(task.source.is_none());
        assert!(task.origin.is_none());
    }

    #[test]
    fn test_unset_fields_not_written() {
        let task = IncompleteTask::new(7).with_tag("mirror");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value, json!({"cid": 7, "tag": "mirror"}));
    }

    #[test]
    fn test_builder() {
        let task = IncompleteTask::new(1)
            .with_tag("leech")
            .with_source("https://example.com/file")
            .with_origin(json!({"message_id": 5}));
        assert_eq!(task.tag.as_deref(), Some("leech"));
        assert_eq!(task.source.as_deref(), Some("https://example.com/file"));
        assert_eq!(task.origin, Some(json!({"message_id": 5})));
    }
}

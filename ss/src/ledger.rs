//! Durable in-flight task ledger
//!
//! A row is recorded when a job starts and removed when it finishes, so
//! the rows that survive until the next startup identify jobs the previous
//! process died holding. [`TaskLedger::drain`] surfaces them grouped for
//! re-notification and clears the collection in the same logical step.

use eyre::Result;
use tracing::{debug, info, warn};

use crate::collections::Collection;
use crate::connection::Connection;
use crate::domain::{IncompleteTask, RecoveredTask, RecoveryGroups, UNKNOWN_SOURCE, UNTAGGED};

/// Durable tracker for jobs currently in flight
pub struct TaskLedger {
    conn: Connection,
    bot_id: i64,
}

impl TaskLedger {
    /// Create a ledger for the given bot instance
    pub fn new(conn: Connection, bot_id: i64) -> Self {
        Self { conn, bot_id }
    }

    fn collection(&self) -> String {
        Collection::Tasks.qualified(self.bot_id)
    }

    /// Record a job as in flight, keyed by its unique link
    ///
    /// Callers guarantee link uniqueness; a duplicate insert is a store
    /// error and propagates like any other write failure.
    pub async fn record(&self, link: &str, task: &IncompleteTask) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        debug!(link, cid = task.cid, "recording in-flight task");
        store
            .insert(&self.collection(), link, &serde_json::to_value(task)?)
            .await?;
        Ok(())
    }

    /// Remove a finished or cancelled job; no-op if the row is absent
    pub async fn remove(&self, link: &str) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        store.delete(&self.collection(), link).await?;
        Ok(())
    }

    /// Read every surviving row grouped for notification, then clear
    ///
    /// Returns `chat id -> tag -> tasks` in discovery order. Rows missing
    /// a tag group under [`UNTAGGED`]; rows missing a source description
    /// get [`UNKNOWN_SOURCE`]. The read and the clear are not atomic
    /// against concurrent [`TaskLedger::record`] calls, so this must only
    /// run at startup before new jobs begin.
    pub async fn drain(&self) -> Result<RecoveryGroups> {
        let mut groups = RecoveryGroups::new();
        let Some(store) = self.conn.store() else {
            return Ok(groups);
        };
        let collection = self.collection();
        for (link, doc) in store.list(&collection).await? {
            let task: IncompleteTask = match serde_json::from_value(doc) {
                Ok(task) => task,
                Err(e) => {
                    warn!(link, error = %e, "skipping malformed ledger row");
                    continue;
                }
            };
            let tag = task.tag.unwrap_or_else(|| UNTAGGED.to_string());
            let source = task.source.unwrap_or_else(|| UNKNOWN_SOURCE.to_string());
            groups
                .entry(task.cid)
                .or_default()
                .entry(tag)
                .or_default()
                .push(RecoveredTask { link, source });
        }
        store.drop_collection(&collection).await?;
        if !groups.is_empty() {
            info!(chats = groups.len(), "found incomplete tasks from previous run");
        }
        Ok(groups)
    }
}

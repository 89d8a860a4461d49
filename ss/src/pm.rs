//! Registry of users who have PMed the bot
//!
//! Append-only and deduplicated; this layer never updates or deletes a
//! registration.

use eyre::Result;
use serde_json::{Map, Value};
use tracing::debug;

use crate::collections::Collection;
use crate::connection::Connection;

/// Deduplicated set of users who have opened a private conversation
pub struct PmRegistry {
    conn: Connection,
    bot_id: i64,
}

impl PmRegistry {
    /// Create a registry for the given bot instance
    pub fn new(conn: Connection, bot_id: i64) -> Self {
        Self { conn, bot_id }
    }

    /// Register a user unless already present
    ///
    /// Returns `true` only when a new registration occurred, so the caller
    /// can log first contacts. `false` without touching the store when
    /// disabled or degraded.
    pub async fn register(&self, owner: i64) -> Result<bool> {
        let Some(store) = self.conn.store() else {
            return Ok(false);
        };
        let collection = Collection::PmUsers.qualified(self.bot_id);
        let id = owner.to_string();
        if store.exists(&collection, &id).await? {
            return Ok(false);
        }
        store.insert(&collection, &id, &Value::Object(Map::new())).await?;
        debug!(owner, "registered new pm user");
        Ok(true)
    }
}

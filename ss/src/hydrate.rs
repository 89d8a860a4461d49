//! One-shot startup hydration
//!
//! Pulls persisted state into the in-memory container before the bot
//! accepts work: settings are reconciled with process defaults, user rows
//! have their attachments rehomed onto the filesystem, feed rows are
//! mirrored as-is. A bad row is dropped with a warning; it never aborts
//! the rest of the load.

use std::path::PathBuf;

use docstore::DocStore;
use eyre::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::collections::Collection;
use crate::config::SyncConfig;
use crate::connection::Connection;
use crate::domain::{BlobKind, UserDoc, UserProfile};
use crate::state::BotState;

/// One-shot startup loader
///
/// Construct after [`Connection::establish`] and call [`Hydrator::run`]
/// exactly once, before any writer activity.
pub struct Hydrator {
    conn: Connection,
    bot_id: i64,
    work_dir: PathBuf,
}

impl Hydrator {
    /// Create a hydrator for the configured bot instance
    pub fn new(conn: Connection, config: &SyncConfig) -> Self {
        Self {
            conn,
            bot_id: config.bot_id,
            work_dir: config.work_dir.clone(),
        }
    }

    /// Load persisted state into the container
    ///
    /// No-op when the store is disabled or degraded. Store-level failures
    /// propagate; single-row failures are dropped and logged.
    pub async fn run(&self, state: &BotState) -> Result<()> {
        let Some(store) = self.conn.store() else {
            debug!("store unavailable, skipping hydration");
            return Ok(());
        };
        self.sync_settings(store, state).await?;
        self.load_users(store, state).await?;
        self.load_feeds(store, state).await?;
        Ok(())
    }

    /// Reconcile settings docs with process defaults
    ///
    /// Stored values win over defaults key-by-key; the merged result is
    /// pushed back so the store always reflects the running configuration.
    async fn sync_settings(&self, store: &DocStore, state: &BotState) -> Result<()> {
        for (collection, table) in [
            (Collection::Config, &state.config),
            (Collection::Aria2, &state.aria2),
            (Collection::Qbittorrent, &state.qbit),
        ] {
            let name = collection.qualified(self.bot_id);
            let id = self.bot_id.to_string();
            let mut table = table.write().await;
            if let Some(Value::Object(stored)) = store.get(&name, &id).await? {
                for (key, value) in stored {
                    table.insert(key, value);
                }
            }
            store.put(&name, &id, &Value::Object(table.clone())).await?;
        }
        Ok(())
    }

    async fn load_users(&self, store: &DocStore, state: &BotState) -> Result<()> {
        let name = Collection::Users.qualified(self.bot_id);
        if !store.has_any(&name).await? {
            return Ok(());
        }
        let mut users = state.users.write().await;
        for (id, doc) in store.list(&name).await? {
            match self.rebuild_profile(&id, doc).await {
                Ok((owner, profile)) => {
                    users.insert(owner, profile);
                }
                Err(e) => warn!(owner = %id, error = %e, "dropping user row from hydration"),
            }
        }
        info!(count = users.len(), "user data imported from database");
        Ok(())
    }

    /// Decode one stored row and rehome its attachments to disk
    ///
    /// Any failure drops the whole row; the in-memory table never sees a
    /// partially extracted profile.
    async fn rebuild_profile(&self, id: &str, doc: Value) -> Result<(i64, UserProfile)> {
        let owner: i64 = id.parse().context("invalid owner id")?;
        let doc: UserDoc = serde_json::from_value(doc).context("malformed user document")?;

        let mut profile = UserProfile::default();
        for kind in BlobKind::ALL {
            let Some(bytes) = doc.blob(kind) else { continue };
            let dir = self.work_dir.join(kind.dir());
            fs::create_dir_all(&dir)
                .await
                .context(format!("Failed to create {}", dir.display()))?;
            let path = self.work_dir.join(kind.rel_path(owner));
            fs::write(&path, bytes)
                .await
                .context(format!("Failed to write {}", path.display()))?;
            profile.set_blob_path(kind, path);
        }
        profile.prefs = doc.prefs;
        Ok((owner, profile))
    }

    async fn load_feeds(&self, store: &DocStore, state: &BotState) -> Result<()> {
        let name = Collection::Rss.qualified(self.bot_id);
        if !store.has_any(&name).await? {
            return Ok(());
        }
        let mut rss = state.rss.write().await;
        for (id, doc) in store.list(&name).await? {
            let Ok(owner) = id.parse::<i64>() else {
                warn!(owner = %id, "dropping rss row with invalid owner id");
                continue;
            };
            match doc {
                Value::Object(feeds) => {
                    rss.insert(owner, feeds);
                }
                _ => warn!(owner, "dropping malformed rss row"),
            }
        }
        info!(count = rss.len(), "rss data imported from database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigMap;
    use docstore::DocStore;
    use serde_json::json;

    fn test_config(work_dir: &std::path::Path) -> SyncConfig {
        SyncConfig {
            database_url: None,
            bot_id: 42,
            work_dir: work_dir.to_path_buf(),
            env_file: PathBuf::from("config.env"),
        }
    }

    #[tokio::test]
    async fn test_disabled_store_is_noop() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let hydrator = Hydrator::new(Connection::establish(&config), &config);

        let state = BotState::new();
        hydrator.run(&state).await.unwrap();
        assert!(state.users.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_settings_merge_prefers_stored_values() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let store = DocStore::open_in_memory().unwrap();
        store
            .put("settings.config", "42", &json!({"upstream_repo": "fork", "extra": true}))
            .await
            .unwrap();

        let defaults: ConfigMap = [
            ("upstream_repo".to_string(), json!("origin")),
            ("cmd_suffix".to_string(), json!("1")),
        ]
        .into_iter()
        .collect();
        let state = BotState::with_defaults(defaults, ConfigMap::new(), ConfigMap::new());

        let hydrator = Hydrator::new(Connection::with_store(store.clone()), &config);
        hydrator.run(&state).await.unwrap();

        // Stored value wins, default-only keys survive
        let merged = state.config.read().await;
        assert_eq!(merged["upstream_repo"], json!("fork"));
        assert_eq!(merged["cmd_suffix"], json!("1"));
        assert_eq!(merged["extra"], json!(true));

        // Merged result was pushed back (self-heal)
        let stored = store.get("settings.config", "42").await.unwrap().unwrap();
        assert_eq!(stored["cmd_suffix"], json!("1"));
    }

    #[tokio::test]
    async fn test_corrupt_row_dropped_others_survive() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let store = DocStore::open_in_memory().unwrap();

        store
            .put("users.42", "1001", &json!({"thumb": "!!not-base64!!", "pref": 1}))
            .await
            .unwrap();
        store.put("users.42", "1002", &json!({"pref": 2})).await.unwrap();

        let state = BotState::new();
        let hydrator = Hydrator::new(Connection::with_store(store), &config);
        hydrator.run(&state).await.unwrap();

        let users = state.users.read().await;
        assert!(!users.contains_key(&1001));
        assert_eq!(users[&1002].prefs["pref"], json!(2));
    }

    #[tokio::test]
    async fn test_feeds_loaded_keyed_by_owner() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let store = DocStore::open_in_memory().unwrap();

        store
            .put("rss.42", "1001", &json!({"news": {"link": "https://example.com/rss"}}))
            .await
            .unwrap();

        let state = BotState::new();
        let hydrator = Hydrator::new(Connection::with_store(store), &config);
        hydrator.run(&state).await.unwrap();

        let rss = state.rss.read().await;
        assert_eq!(rss[&1001]["news"]["link"], json!("https://example.com/rss"));
    }
}

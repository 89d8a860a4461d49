//! Incremental store writes
//!
//! One upsert per mutable entity type, invoked by the command layer
//! whenever in-memory state changes. Callers always pass the complete new
//! value; nothing here reads the state container or the store first.
//! Every operation is a silent no-op when the store is disabled or
//! degraded; other store failures propagate so the caller can log and
//! carry on.

use std::collections::HashMap;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eyre::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::collections::Collection;
use crate::config::SyncConfig;
use crate::connection::Connection;
use crate::domain::{BlobKind, ConfigMap, FeedMap, UserDoc, UserProfile};

/// Fire-and-forget upserts keyed by bot instance or owner id
pub struct Writer {
    conn: Connection,
    bot_id: i64,
    env_file: PathBuf,
}

impl Writer {
    /// Create a writer for the configured bot instance
    pub fn new(conn: Connection, config: &SyncConfig) -> Self {
        Self {
            conn,
            bot_id: config.bot_id,
            env_file: config.env_file.clone(),
        }
    }

    fn singleton_id(&self) -> String {
        self.bot_id.to_string()
    }

    /// Replace the stored runtime configuration wholesale
    pub async fn update_config(&self, config: &ConfigMap) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let name = Collection::Config.qualified(self.bot_id);
        store
            .put(&name, &self.singleton_id(), &Value::Object(config.clone()))
            .await?;
        Ok(())
    }

    /// Update a single aria2 option key
    pub async fn update_aria2(&self, key: &str, value: Value) -> Result<()> {
        self.merge_setting(Collection::Aria2, key, value).await
    }

    /// Update a single qBittorrent option key
    pub async fn update_qbittorrent(&self, key: &str, value: Value) -> Result<()> {
        self.merge_setting(Collection::Qbittorrent, key, value).await
    }

    async fn merge_setting(&self, collection: Collection, key: &str, value: Value) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        debug!(%collection, key, "updating option key");
        let mut fields = Map::new();
        fields.insert(key.to_string(), value);
        store
            .merge(&collection.qualified(self.bot_id), &self.singleton_id(), &fields)
            .await?;
        Ok(())
    }

    /// Snapshot the deploy env file, replacing the prior snapshot
    pub async fn update_deploy_config(&self) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let mut snapshot = ConfigMap::new();
        let vars = dotenvy::from_path_iter(&self.env_file)
            .context(format!("Failed to read {}", self.env_file.display()))?;
        for item in vars {
            let (key, value) = item.context("Failed to parse env file")?;
            snapshot.insert(key, Value::String(value));
        }
        let name = Collection::DeployConfig.qualified(self.bot_id);
        store
            .put(&name, &self.singleton_id(), &Value::Object(snapshot))
            .await?;
        Ok(())
    }

    /// Record the last known private-file path
    pub async fn update_private_file(&self, file_path: &str) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let mut fields = Map::new();
        fields.insert("file_path".to_string(), Value::String(file_path.to_string()));
        let name = Collection::PrivateFiles.qualified(self.bot_id);
        store.merge(&name, &self.singleton_id(), &fields).await?;
        Ok(())
    }

    /// Replace a user's stored profile
    ///
    /// The three attachment path fields are stripped; only scalar prefs go
    /// back to the store.
    pub async fn update_user(&self, owner: i64, profile: &UserProfile) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        debug!(owner, "updating user profile");
        let doc = UserDoc {
            prefs: profile.prefs.clone(),
            ..Default::default()
        };
        let name = Collection::Users.qualified(self.bot_id);
        store
            .put(&name, &owner.to_string(), &serde_json::to_value(&doc)?)
            .await?;
        Ok(())
    }

    /// Write one attachment's bytes into a user's stored profile
    ///
    /// This is the ingestion path hydration later reads back from; the
    /// other profile fields are left untouched.
    pub async fn update_user_blob(&self, owner: i64, kind: BlobKind, bytes: &[u8]) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        debug!(owner, blob = %kind, len = bytes.len(), "storing user attachment");
        let mut fields = Map::new();
        fields.insert(kind.field().to_string(), Value::String(STANDARD.encode(bytes)));
        let name = Collection::Users.qualified(self.bot_id);
        store.merge(&name, &owner.to_string(), &fields).await?;
        Ok(())
    }

    /// Replace one owner's stored feed set
    pub async fn update_rss(&self, owner: i64, feeds: &FeedMap) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let name = Collection::Rss.qualified(self.bot_id);
        store
            .put(&name, &owner.to_string(), &Value::Object(feeds.clone()))
            .await?;
        Ok(())
    }

    /// Resync the whole feed table, one document per owner
    pub async fn resync_rss(&self, all: &HashMap<i64, FeedMap>) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let name = Collection::Rss.qualified(self.bot_id);
        for (owner, feeds) in all {
            store
                .put(&name, &owner.to_string(), &Value::Object(feeds.clone()))
                .await?;
        }
        Ok(())
    }

    /// Drop every document in one collection for this bot instance
    pub async fn truncate(&self, collection: Collection) -> Result<()> {
        let Some(store) = self.conn.store() else { return Ok(()) };
        let removed = store.drop_collection(&collection.qualified(self.bot_id)).await?;
        debug!(%collection, removed, "truncated collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::DocStore;
    use serde_json::json;

    fn test_writer(store: DocStore) -> Writer {
        let config = SyncConfig {
            bot_id: 42,
            ..Default::default()
        };
        Writer::new(Connection::with_store(store), &config)
    }

    #[tokio::test]
    async fn test_config_write_replaces_not_merges() {
        let store = DocStore::open_in_memory().unwrap();
        let writer = test_writer(store.clone());

        let first: ConfigMap = [("a".to_string(), json!(1))].into_iter().collect();
        writer.update_config(&first).await.unwrap();

        let second: ConfigMap = [("a".to_string(), json!(2)), ("b".to_string(), json!(3))]
            .into_iter()
            .collect();
        writer.update_config(&second).await.unwrap();

        let stored = store.get("settings.config", "42").await.unwrap().unwrap();
        assert_eq!(stored, json!({"a": 2, "b": 3}));
    }

    #[tokio::test]
    async fn test_downloader_key_update_merges() {
        let store = DocStore::open_in_memory().unwrap();
        let writer = test_writer(store.clone());

        writer.update_aria2("max-connection-per-server", json!("10")).await.unwrap();
        writer.update_aria2("split", json!("16")).await.unwrap();

        let stored = store.get("settings.aria2c", "42").await.unwrap().unwrap();
        assert_eq!(stored, json!({"max-connection-per-server": "10", "split": "16"}));
    }

    #[tokio::test]
    async fn test_user_write_strips_attachment_fields() {
        let store = DocStore::open_in_memory().unwrap();
        let writer = test_writer(store.clone());

        let profile = UserProfile {
            thumb: Some(PathBuf::from("Thumbnails/1001.jpg")),
            rclone: None,
            watermark: None,
            prefs: [("as_doc".to_string(), json!(true))].into_iter().collect(),
        };
        writer.update_user(1001, &profile).await.unwrap();

        let stored = store.get("users.42", "1001").await.unwrap().unwrap();
        assert_eq!(stored, json!({"as_doc": true}));
    }

    #[tokio::test]
    async fn test_blob_ingestion_keeps_other_fields() {
        let store = DocStore::open_in_memory().unwrap();
        let writer = test_writer(store.clone());

        let profile = UserProfile {
            prefs: [("as_doc".to_string(), json!(true))].into_iter().collect(),
            ..Default::default()
        };
        writer.update_user(1001, &profile).await.unwrap();
        writer
            .update_user_blob(1001, BlobKind::Thumbnail, &[0xff, 0xd8, 0xff])
            .await
            .unwrap();

        let stored = store.get("users.42", "1001").await.unwrap().unwrap();
        assert_eq!(stored["as_doc"], json!(true));
        assert_eq!(stored["thumb"], json!("/9j/"));
    }

    #[tokio::test]
    async fn test_truncate_clears_one_collection() {
        let store = DocStore::open_in_memory().unwrap();
        let writer = test_writer(store.clone());

        writer.update_rss(1, &FeedMap::new()).await.unwrap();
        writer.update_rss(2, &FeedMap::new()).await.unwrap();
        writer.update_user(1, &UserProfile::default()).await.unwrap();

        writer.truncate(Collection::Rss).await.unwrap();

        assert!(!store.has_any("rss.42").await.unwrap());
        assert!(store.has_any("users.42").await.unwrap());
    }

    #[tokio::test]
    async fn test_degraded_writes_are_silent_noops() {
        let temp = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            // A directory cannot be opened as a database
            database_url: Some(temp.path().to_string_lossy().into_owned()),
            bot_id: 42,
            ..Default::default()
        };
        let conn = Connection::establish(&config);
        assert!(conn.is_degraded());

        let writer = Writer::new(conn, &config);
        writer.update_config(&ConfigMap::new()).await.unwrap();
        writer.update_aria2("split", json!("16")).await.unwrap();
        writer.update_user(1, &UserProfile::default()).await.unwrap();
        writer.truncate(Collection::Rss).await.unwrap();
    }

    #[tokio::test]
    async fn test_deploy_snapshot_replaces() {
        let temp = tempfile::tempdir().unwrap();
        let env_file = temp.path().join("config.env");
        std::fs::write(&env_file, "OWNER_ID=1001\nUPSTREAM_REPO=origin\n").unwrap();

        let store = DocStore::open_in_memory().unwrap();
        let config = SyncConfig {
            bot_id: 42,
            env_file: env_file.clone(),
            ..Default::default()
        };
        let writer = Writer::new(Connection::with_store(store.clone()), &config);

        writer.update_deploy_config().await.unwrap();
        let stored = store.get("settings.deploy_config", "42").await.unwrap().unwrap();
        assert_eq!(stored, json!({"OWNER_ID": "1001", "UPSTREAM_REPO": "origin"}));

        // A shrunken env file fully replaces the old snapshot
        std::fs::write(&env_file, "OWNER_ID=1002\n").unwrap();
        writer.update_deploy_config().await.unwrap();
        let stored = store.get("settings.deploy_config", "42").await.unwrap().unwrap();
        assert_eq!(stored, json!({"OWNER_ID": "1002"}));
    }
}

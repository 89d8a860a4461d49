//! Core DocStore implementation

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Handle to a document store
///
/// Cheap to clone; all clones share one SQLite connection. Every operation
/// runs on the blocking thread pool so callers can await from any task.
#[derive(Clone)]
pub struct DocStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocStore {
    /// Open (or create) a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened document store");
        Self::init(conn)
    }

    /// Open a transient in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                doc TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Runtime(e.to_string()))?
    }

    /// Fetch a document by id, `None` if absent
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|s| serde_json::from_str(&s).map_err(StoreError::from))
                .transpose()
        })
        .await
    }

    /// Upsert a document, replacing any existing content wholesale
    pub async fn put(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        if !doc.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let (collection, id) = (collection.to_string(), id.to_string());
        let raw = serde_json::to_string(doc)?;
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, id, doc, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
                params![collection, id, raw, now_ms()],
            )?;
            Ok(())
        })
        .await
    }

    /// Insert a new document; fails if the id is already present
    pub async fn insert(&self, collection: &str, id: &str, doc: &Value) -> Result<(), StoreError> {
        if !doc.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let (collection, id) = (collection.to_string(), id.to_string());
        let raw = serde_json::to_string(doc)?;
        self.call(move |conn| {
            let result = conn.execute(
                "INSERT INTO documents (collection, id, doc, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![collection, id, raw, now_ms()],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::DuplicateId(id))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Set individual fields on a document, creating it if absent
    ///
    /// Fields not named in `fields` keep their stored values.
    pub async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        let fields = fields.clone();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let raw: Option<String> = tx
                .query_row(
                    "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let mut doc: Map<String, Value> = match raw {
                Some(s) => match serde_json::from_str(&s)? {
                    Value::Object(map) => map,
                    _ => return Err(StoreError::NotAnObject),
                },
                None => Map::new(),
            };
            doc.extend(fields);
            let raw = serde_json::to_string(&Value::Object(doc))?;
            tx.execute(
                "INSERT INTO documents (collection, id, doc, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
                params![collection, id, raw, now_ms()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Delete a document; returns whether a row was removed
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |conn| {
            let n = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?;
            Ok(n > 0)
        })
        .await
    }

    /// Check whether a document exists
    pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let (collection, id) = (collection.to_string(), id.to_string());
        self.call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
        .await
    }

    /// Check whether a collection holds any documents
    pub async fn has_any(&self, collection: &str) -> Result<bool, StoreError> {
        let collection = collection.to_string();
        self.call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
        .await
    }

    /// List all documents in a collection in insertion order
    pub async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let collection = collection.to_string();
        self.call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, doc FROM documents WHERE collection = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut docs = Vec::new();
            for row in rows {
                let (id, raw) = row?;
                docs.push((id, serde_json::from_str(&raw)?));
            }
            Ok(docs)
        })
        .await
    }

    /// Drop every document in a collection; returns how many were removed
    pub async fn drop_collection(&self, collection: &str) -> Result<usize, StoreError> {
        let collection = collection.to_string();
        self.call(move |conn| {
            let n = conn.execute(
                "DELETE FROM documents WHERE collection = ?1",
                params![collection],
            )?;
            debug!(%collection, removed = n, "dropped collection");
            Ok(n)
        })
        .await
    }
}

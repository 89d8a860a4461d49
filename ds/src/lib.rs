//! DocStore - per-collection JSON document store over SQLite
//!
//! Stores schemaless JSON documents keyed by string id inside named
//! collections, all in a single SQLite database file. Callers work with
//! documents only (get, put, merge, insert, delete, list, drop); the SQL
//! layer is an implementation detail.
//!
//! # Architecture
//!
//! ```text
//! state.db
//! └── documents            # one table for every collection
//!     ├── (collection, id) # composite primary key
//!     ├── doc              # JSON text
//!     └── updated_at       # unix ms, bumped on every write
//! ```
//!
//! Every operation is async: the SQLite connection lives behind a mutex and
//! each call hops through `tokio::task::spawn_blocking`, so a slow disk never
//! stalls the caller's executor. The handle is cheap to clone and is meant to
//! be shared for the process lifetime.
//!
//! # Example
//!
//! ```ignore
//! use docstore::DocStore;
//!
//! let store = DocStore::open("state.db")?;
//! store.put("users.42", "1001", &doc).await?;
//! let doc = store.get("users.42", "1001").await?;
//! ```

pub mod error;
mod store;

pub use error::StoreError;
pub use store::DocStore;

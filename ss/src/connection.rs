//! Shared store connection and degraded latch
//!
//! One `Connection` is established at startup and cloned into every
//! component. A failed open never propagates: it latches the handle into
//! degraded mode and the bot runs ephemerally for the rest of the process
//! lifetime.

use std::sync::Arc;

use docstore::DocStore;
use tracing::{error, info};

use crate::config::SyncConfig;

#[derive(Clone)]
enum ConnState {
    /// No database configured; the whole layer is inert
    Disabled,
    /// Open failed at startup; latched for the process lifetime
    Degraded,
    /// Store is available
    Ready(Arc<DocStore>),
}

/// Shared handle to the document store
///
/// Cheap to clone. Components call [`Connection::store`] before every
/// operation and no-op when it returns `None`.
#[derive(Clone)]
pub struct Connection {
    state: ConnState,
}

impl Connection {
    /// Attempt to open the configured store; never fails
    ///
    /// Absence of a `database-url` disables the layer; an open failure is
    /// logged once and latches degraded mode.
    pub fn establish(config: &SyncConfig) -> Self {
        let Some(url) = &config.database_url else {
            info!("no database configured, running without persistence");
            return Self { state: ConnState::Disabled };
        };
        match DocStore::open(url) {
            Ok(store) => {
                info!(%url, "connected to state database");
                Self {
                    state: ConnState::Ready(Arc::new(store)),
                }
            }
            Err(e) => {
                error!(%url, error = %e, "failed to open state database, continuing without persistence");
                Self { state: ConnState::Degraded }
            }
        }
    }

    /// Wrap an already-open store (embedding and tests)
    pub fn with_store(store: DocStore) -> Self {
        Self {
            state: ConnState::Ready(Arc::new(store)),
        }
    }

    /// The store handle, `None` when disabled or degraded
    pub fn store(&self) -> Option<&DocStore> {
        match &self.state {
            ConnState::Ready(store) => Some(store),
            _ => None,
        }
    }

    /// Whether the open attempt failed at startup
    pub fn is_degraded(&self) -> bool {
        matches!(self.state, ConnState::Degraded)
    }
}

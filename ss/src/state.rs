//! Owned in-memory state container
//!
//! Every table the persistence layer mirrors lives here, behind one
//! explicitly owned struct instead of ambient globals. Initialization
//! order matters: construct with process defaults, run the
//! [`Hydrator`](crate::Hydrator) exactly once, then start accepting
//! writes from the command layer.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::{ConfigMap, FeedMap, UserProfile};

/// Process-wide mutable state mirrored into the store
///
/// The hydrator is the only component of this layer that mutates these
/// tables; the writer only reads values its callers pass in.
#[derive(Debug, Default)]
pub struct BotState {
    /// Global runtime configuration
    pub config: RwLock<ConfigMap>,
    /// aria2 downloader options
    pub aria2: RwLock<ConfigMap>,
    /// qBittorrent downloader options
    pub qbit: RwLock<ConfigMap>,
    /// Per-user profiles keyed by owner id
    pub users: RwLock<HashMap<i64, UserProfile>>,
    /// Per-user feed sets keyed by owner id
    pub rss: RwLock<HashMap<i64, FeedMap>>,
}

impl BotState {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container seeded with process default settings
    pub fn with_defaults(config: ConfigMap, aria2: ConfigMap, qbit: ConfigMap) -> Self {
        Self {
            config: RwLock::new(config),
            aria2: RwLock::new(aria2),
            qbit: RwLock::new(qbit),
            users: RwLock::new(HashMap::new()),
            rss: RwLock::new(HashMap::new()),
        }
    }
}

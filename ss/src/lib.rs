//! StateSync - bot state persistence and startup hydration
//!
//! StateSync mirrors a long-running bot's in-memory operational state
//! (configuration, per-user profiles with binary attachments, subscription
//! feeds, in-flight task records) into a document store, and reconstructs
//! that state when the process starts. Command handling and job execution
//! live elsewhere; this layer only keeps their state alive across restarts.
//!
//! # Core Concepts
//!
//! - **Ephemeral by default**: no `database-url` configured means every
//!   operation is a silent no-op and the bot runs purely in memory
//! - **Degraded is terminal**: a failed open at startup latches the layer
//!   into no-op mode for the process lifetime; there is no reconnect
//! - **Hydrate once**: stored state is loaded in a single pass before the
//!   bot accepts work, with stored blobs rehomed onto the filesystem
//! - **Per-row isolation**: a corrupt user row is dropped with a warning,
//!   never aborting the rest of the load
//! - **Fire-and-forget writes**: incremental upserts are keyed by owner id
//!   and never read-modify-write
//!
//! # Modules
//!
//! - [`config`] - configuration types and loading
//! - [`connection`] - the shared store handle and degraded latch
//! - [`state`] - the owned in-memory state container
//! - [`domain`] - persisted record types
//! - [`hydrate`] - one-shot startup loader
//! - [`writer`] - incremental upserts invoked on state changes
//! - [`ledger`] - durable in-flight task tracking for crash recovery
//! - [`pm`] - append-only registry of users who have PMed the bot
//!
//! # Startup Order
//!
//! ```ignore
//! let cfg = SyncConfig::load(None)?;
//! let state = BotState::with_defaults(config_defaults, aria2_defaults, qbit_defaults);
//! let conn = Connection::establish(&cfg);
//!
//! Hydrator::new(conn.clone(), &cfg).run(&state).await?;
//! let recovered = TaskLedger::new(conn.clone(), cfg.bot_id).drain().await?;
//! // notify the chats in `recovered`, then start accepting commands
//! ```

pub mod collections;
pub mod config;
pub mod connection;
pub mod domain;
pub mod hydrate;
pub mod ledger;
pub mod pm;
pub mod state;
pub mod writer;

pub use collections::Collection;
pub use config::SyncConfig;
pub use connection::Connection;
pub use domain::{
    BlobKind, ConfigMap, FeedMap, IncompleteTask, RecoveredTask, RecoveryGroups, UserDoc,
    UserProfile,
};
pub use hydrate::Hydrator;
pub use ledger::TaskLedger;
pub use pm::PmRegistry;
pub use state::BotState;
pub use writer::Writer;

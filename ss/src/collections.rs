//! Store collection names
//!
//! The closed set of collections this layer touches. Settings singletons
//! share a fixed collection and use the bot id as the document id; per-owner
//! collections are qualified by bot id and use the owner id (or job link) as
//! the document id.

/// A known store collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Global runtime configuration (singleton)
    Config,
    /// aria2 downloader options (singleton)
    Aria2,
    /// qBittorrent downloader options (singleton)
    Qbittorrent,
    /// Last known deploy-configuration snapshot (singleton)
    DeployConfig,
    /// Last known private-file path (singleton)
    PrivateFiles,
    /// Per-user profiles
    Users,
    /// Per-user rss feed sets
    Rss,
    /// In-flight task ledger
    Tasks,
    /// Users who have opened a private conversation
    PmUsers,
}

impl Collection {
    /// Base collection name in the store
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Config => "settings.config",
            Self::Aria2 => "settings.aria2c",
            Self::Qbittorrent => "settings.qbittorrent",
            Self::DeployConfig => "settings.deploy_config",
            Self::PrivateFiles => "settings.private_files",
            Self::Users => "users",
            Self::Rss => "rss",
            Self::Tasks => "tasks",
            Self::PmUsers => "pm_users",
        }
    }

    /// Whether this collection holds a single per-bot document
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            Self::Config | Self::Aria2 | Self::Qbittorrent | Self::DeployConfig | Self::PrivateFiles
        )
    }

    /// Fully qualified collection name for a bot instance
    ///
    /// Singletons keep their base name (the bot id becomes the document id);
    /// per-owner collections are scoped per instance.
    pub fn qualified(&self, bot_id: i64) -> String {
        if self.is_singleton() {
            self.base_name().to_string()
        } else {
            format!("{}.{}", self.base_name(), bot_id)
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_names_unscoped() {
        assert_eq!(Collection::Config.qualified(42), "settings.config");
        assert_eq!(Collection::DeployConfig.qualified(42), "settings.deploy_config");
    }

    #[test]
    fn test_per_owner_names_scoped_by_bot() {
        assert_eq!(Collection::Users.qualified(42), "users.42");
        assert_eq!(Collection::Tasks.qualified(42), "tasks.42");
        assert_eq!(Collection::PmUsers.qualified(7), "pm_users.7");
    }
}

//! StateSync configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Store database path; `None` disables persistence entirely
    #[serde(rename = "database-url")]
    pub database_url: Option<String>,

    /// Bot instance id; scopes every per-owner collection
    #[serde(rename = "bot-id")]
    pub bot_id: i64,

    /// Root directory blobs are rehomed under during hydration
    #[serde(rename = "work-dir")]
    pub work_dir: PathBuf,

    /// Env file the deploy-configuration snapshot is sourced from
    #[serde(rename = "env-file")]
    pub env_file: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bot_id: 0,
            work_dir: PathBuf::from("."),
            env_file: PathBuf::from("config.env"),
        }
    }
}

impl SyncConfig {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_some() && self.bot_id == 0 {
            return Err(eyre::eyre!(
                "bot-id must be set when database-url is configured"
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .statesync.yml
        let local_config = PathBuf::from(".statesync.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/statesync/statesync.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("statesync").join("statesync.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.bot_id, 0);
        assert_eq!(config.work_dir, PathBuf::from("."));
        assert_eq!(config.env_file, PathBuf::from("config.env"));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
database-url: /var/lib/bot/state.db
bot-id: 123456
work-dir: /var/lib/bot
"#;
        let config: SyncConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("/var/lib/bot/state.db"));
        assert_eq!(config.bot_id, 123456);
        assert_eq!(config.work_dir, PathBuf::from("/var/lib/bot"));
        // Unset fields fall back to defaults
        assert_eq!(config.env_file, PathBuf::from("config.env"));
    }

    #[test]
    fn test_validate_requires_bot_id() {
        let config = SyncConfig {
            database_url: Some("state.db".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sync.yml");
        fs::write(&path, "bot-id: 7\n").unwrap();

        let config = SyncConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bot_id, 7);

        let missing = temp.path().join("absent.yml");
        assert!(SyncConfig::load(Some(&missing)).is_err());
    }
}

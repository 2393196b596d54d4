// # File Config Store
//
// JSON file implementation of ConfigStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: temp file + rename (same path as hosts commits)
// - Backup: the previous good file is copied to `.backup` before each save
// - Corruption detection: a file that fails to parse is treated as corrupt
// - Recovery: falls back to `.backup` and restores the main file from it
//
// ## File Format
//
// ```json
// {
//   "updateInterval": 60,
//   "lastUpdate": "2025-01-09T12:00:00Z",
//   "version": "1.0.0",
//   "autoUpdate": true
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hosts::commit;
use crate::traits::ConfigStore;

/// File-based config store with crash recovery
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store backed by `path`. Nothing is read or created until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone();
        backup.set_extension("backup");
        backup
    }

    async fn read(path: &Path) -> Result<Option<Config>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::read(path, e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn recover(&self, cause: Error) -> Result<Option<Config>> {
        tracing::warn!(
            path = %self.path.display(),
            error = %cause,
            "Config file appears corrupted, attempting recovery from backup"
        );

        let backup_path = self.backup_path();
        match Self::read(&backup_path).await {
            Ok(Some(config)) => {
                if let Err(e) = fs::copy(&backup_path, &self.path).await {
                    tracing::error!(error = %e, "Failed to restore config file from backup");
                } else {
                    tracing::info!(path = %self.path.display(), "Restored config file from backup");
                }
                Ok(Some(config))
            }
            Ok(None) => {
                tracing::warn!("No config backup found, starting with defaults");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Config backup also unreadable, starting with defaults");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<Option<Config>> {
        match Self::read(&self.path).await {
            Ok(config) => Ok(config),
            Err(e @ Error::Json(_)) => self.recover(e).await,
            Err(e) => Err(e),
        }
    }

    async fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::write(parent, e))?;
            }
        }

        // Keep the last good file around for recovery
        if Self::read(&self.path).await.is_ok_and(|c| c.is_some()) {
            if let Err(e) = fs::copy(&self.path, self.backup_path()).await {
                tracing::warn!(error = %e, "Failed to create config backup");
            }
        }

        commit(&self.path, json).await?;
        tracing::trace!(path = %self.path.display(), "Config written");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for path in [self.path.clone(), self.backup_path()] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::write(&path, e)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdateInterval;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_record_loads_back() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("nested").join("config.json"));

        let config = Config::new(UpdateInterval::HalfHour, true);
        store.save(&config).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn corrupt_file_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::new(&path);

        let first = Config::new(UpdateInterval::Hour, false);
        store.save(&first).await.unwrap();
        let second = Config::new(UpdateInterval::TwoHours, true);
        store.save(&second).await.unwrap();

        // Backup holds `first`; corrupt the main file
        std::fs::write(&path, "{ not json").unwrap();

        let recovered = store.load().await.unwrap();
        assert_eq!(recovered, Some(first.clone()));

        // Main file was restored from the backup
        let reread: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread, first);
    }

    #[tokio::test]
    async fn corruption_without_backup_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = FileConfigStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_file_and_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::new(&path);

        store.save(&Config::default()).await.unwrap();
        store.save(&Config::default()).await.unwrap();
        store.clear().await.unwrap();

        assert!(!path.exists());
        assert!(!store.backup_path().exists());
        store.clear().await.unwrap();
    }
}

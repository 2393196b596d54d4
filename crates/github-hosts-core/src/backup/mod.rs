// # Backup Store
//
// Timestamped snapshots of the hosts file.
//
// ## Layout
//
// ```text
// ~/.github-hosts/backups/
//   hosts_20250109120000
//   hosts_20250108093012
// ```
//
// The name embeds a second-resolution UTC timestamp, so sorting names in
// descending order is reverse chronological. Two snapshots in the same
// second share a name and the later one wins. Files without the `hosts_`
// prefix are ignored. Nothing is ever pruned automatically.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

use crate::error::{Error, Result};
use crate::hosts::commit;

/// Prefix shared by every snapshot file name
pub const BACKUP_PREFIX: &str = "hosts_";

const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// File name, `hosts_<YYYYMMDDhhmmss>`
    pub name: String,
    /// Size at listing time
    pub size_bytes: u64,
    /// Full path
    pub path: PathBuf,
}

impl BackupRecord {
    /// Creation time decoded from the name, if it has the expected shape
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let stamp = self.name.strip_prefix(BACKUP_PREFIX)?;
        NaiveDateTime::parse_from_str(stamp, NAME_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Snapshot directory manager
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    /// Store rooted at `dir`. The directory is created on first snapshot.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Backup directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` verbatim into a new snapshot named after the current time
    pub async fn snapshot(&self, source: &Path) -> Result<BackupRecord> {
        self.snapshot_at(source, Utc::now()).await
    }

    /// Copy `source` verbatim into a snapshot named after `timestamp`
    pub async fn snapshot_at(&self, source: &Path, timestamp: DateTime<Utc>) -> Result<BackupRecord> {
        let content = fs::read(source).await.map_err(|e| Error::read(source, e))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::write(&self.dir, e))?;

        let name = format!("{BACKUP_PREFIX}{}", timestamp.format(NAME_TIMESTAMP_FORMAT));
        let path = self.dir.join(&name);
        fs::write(&path, &content)
            .await
            .map_err(|e| Error::write(&path, e))?;

        tracing::info!(backup = %name, source = %source.display(), "Created backup");

        Ok(BackupRecord {
            name,
            size_bytes: content.len() as u64,
            path,
        })
    }

    /// All snapshots, newest first. A missing directory is an empty list.
    pub async fn list(&self) -> Result<Vec<BackupRecord>> {
        let read_dir = match fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::read(&self.dir, e)),
        };

        let mut records = Vec::new();
        let mut entries = ReadDirStream::new(read_dir);
        while let Some(entry) = entries.next().await {
            let entry = entry.map_err(|e| Error::read(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(BACKUP_PREFIX) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                // Deleted between readdir and stat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::read(entry.path(), e)),
            };
            if !metadata.is_file() {
                continue;
            }

            records.push(BackupRecord {
                name,
                size_bytes: metadata.len(),
                path: entry.path(),
            });
        }

        records.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(records)
    }

    /// Look a snapshot up by name
    pub async fn find(&self, name: &str) -> Result<BackupRecord> {
        self.list()
            .await?
            .into_iter()
            .find(|record| record.name == name)
            .ok_or_else(|| Error::BackupNotFound(name.to_string()))
    }

    /// Overwrite `target` with the snapshot's bytes.
    ///
    /// The current `target` is snapshotted first so a bad restore can itself
    /// be undone. If the snapshot file has vanished, `target` is untouched.
    pub async fn restore(&self, record: &BackupRecord, target: &Path) -> Result<BackupRecord> {
        let content = match fs::read(&record.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::BackupNotFound(record.name.clone()));
            }
            Err(e) => return Err(Error::read(&record.path, e)),
        };

        let safety = self.snapshot(target).await?;
        commit(target, &content).await?;

        tracing::info!(
            backup = %record.name,
            target = %target.display(),
            "Restored backup"
        );
        Ok(safety)
    }

    /// Remove a snapshot. Not reversible.
    pub async fn delete(&self, record: &BackupRecord) -> Result<()> {
        match fs::remove_file(&record.path).await {
            Ok(()) => {
                tracing::info!(backup = %record.name, "Deleted backup");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::BackupNotFound(record.name.clone()))
            }
            Err(e) => Err(Error::write(&record.path, e)),
        }
    }
}

//! Installation diagnostics
//!
//! Read-mostly checks for the `diagnose` command. The only writes are a
//! throwaway file in each working directory, removed immediately.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::{Config, Platform};

const WRITE_TEST_FILE: &str = ".github-hosts-write-test";

/// State of one working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryStatus {
    /// Exists and accepts new files
    Writable,
    /// Does not exist yet (created on first use)
    Missing,
    /// Exists but cannot be written
    NotWritable(String),
}

/// One checked directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCheck {
    /// Role shown to the user (`base`, `backups`, `logs`)
    pub role: &'static str,
    /// Checked path
    pub path: PathBuf,
    /// Result
    pub status: DirectoryStatus,
}

/// State of the hosts file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostsFileStatus {
    /// Parsed; `writable` tells whether it can be opened for writing
    Ok {
        /// Entries in the managed block
        managed_entries: usize,
        /// Opened for appending without error
        writable: bool,
    },
    /// Markers are broken
    Malformed(String),
    /// Could not be read
    Unreadable(String),
}

/// State of the persisted config record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    /// A record was loaded
    Ok(Config),
    /// Nothing saved yet
    Missing,
    /// Loading failed
    Unreadable(String),
}

/// Full diagnostics report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Host platform
    pub platform: Platform,
    /// Scheduler backend name
    pub backend: &'static str,
    /// Hosts file path
    pub hosts_file: PathBuf,
    /// Hosts file state
    pub hosts: HostsFileStatus,
    /// Base, backup and log directories
    pub directories: Vec<DirectoryCheck>,
    /// Config record state
    pub config: ConfigStatus,
}

impl Diagnostics {
    /// No directory or file problem was found
    pub fn is_healthy(&self) -> bool {
        let hosts_ok = matches!(self.hosts, HostsFileStatus::Ok { writable: true, .. });
        let dirs_ok = self
            .directories
            .iter()
            .all(|check| !matches!(check.status, DirectoryStatus::NotWritable(_)));
        let config_ok = !matches!(self.config, ConfigStatus::Unreadable(_));
        hosts_ok && dirs_ok && config_ok
    }
}

/// Check that `dir` exists and accepts a new file
pub async fn check_directory(dir: &Path) -> DirectoryStatus {
    match fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return DirectoryStatus::NotWritable("not a directory".to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DirectoryStatus::Missing,
        Err(e) => return DirectoryStatus::NotWritable(e.to_string()),
    }

    let test_file = dir.join(WRITE_TEST_FILE);
    if let Err(e) = fs::write(&test_file, b"test").await {
        return DirectoryStatus::NotWritable(e.to_string());
    }
    if let Err(e) = fs::remove_file(&test_file).await {
        tracing::debug!(path = %test_file.display(), error = %e, "Failed to remove write test file");
    }
    DirectoryStatus::Writable
}

/// Check that `path` can be opened for writing without modifying it
pub(crate) async fn is_writable(path: &Path) -> bool {
    fs::OpenOptions::new().append(true).open(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn directory_states() {
        let dir = tempdir().unwrap();
        assert_eq!(check_directory(dir.path()).await, DirectoryStatus::Writable);
        assert!(!dir.path().join(WRITE_TEST_FILE).exists());

        assert_eq!(
            check_directory(&dir.path().join("absent")).await,
            DirectoryStatus::Missing
        );

        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            check_directory(&file).await,
            DirectoryStatus::NotWritable(_)
        ));
    }

    #[tokio::test]
    async fn writable_check_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("hosts");
        std::fs::write(&file, "127.0.0.1 localhost\n").unwrap();

        assert!(is_writable(&file).await);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "127.0.0.1 localhost\n");
        assert!(!is_writable(&dir.path().join("absent")).await);
    }
}

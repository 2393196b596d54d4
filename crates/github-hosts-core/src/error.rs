//! Error types for github-hosts
//!
//! Every fallible operation in the crate returns [`Error`]. Verification
//! outcomes are not errors; they are reported through
//! [`VerificationStatus`](crate::verify::VerificationStatus).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for github-hosts operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Reading a file or directory failed
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Writing, renaming or removing a file failed
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Path that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The managed block markers are unpaired, duplicated or out of order
    #[error("malformed managed block: {0}")]
    MalformedBlock(String),

    /// A backup disappeared between listing and use
    #[error("backup not found: {0}")]
    BackupNotFound(String),

    /// The scheduler backend cannot express the requested interval
    #[error("unsupported update interval: {0} minutes")]
    UnsupportedInterval(u32),

    /// The OS scheduling call exited unsuccessfully
    #[error("scheduler backend {backend} failed: {output}")]
    Provisioner {
        /// Backend name (cron, launchd, schtasks)
        backend: &'static str,
        /// Combined stdout/stderr of the failing command
        output: String,
    },

    /// The managed block is missing or has no entries
    #[error("no managed host entries found")]
    NoEntries,

    /// A hosts line does not describe a valid override entry
    #[error("invalid hosts entry: {0}")]
    InvalidEntry(String),

    /// Fetching the override document failed
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The OS refused to flush its DNS cache
    #[error("DNS cache flush failed: {0}")]
    DnsFlush(String),

    /// The host OS has no scheduler backend
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a read error for `path`
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a write error for `path`
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a malformed block error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBlock(msg.into())
    }

    /// Create a provisioner failure
    pub fn provisioner(backend: &'static str, output: impl Into<String>) -> Self {
        Self::Provisioner {
            backend,
            output: output.into(),
        }
    }

    /// Create an invalid entry error
    pub fn invalid_entry(msg: impl Into<String>) -> Self {
        Self::InvalidEntry(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    ///
    /// Writing the hosts file or the scheduler artifacts usually requires
    /// root (or Administrator on Windows).
    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            Self::Read { source, .. } | Self::Write { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied
        )
    }
}

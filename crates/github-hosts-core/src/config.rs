//! Configuration types for github-hosts
//!
//! Two kinds of configuration live here:
//!
//! - [`Settings`]: immutable process-wide layout (paths, scheduler artifact
//!   names, source URL). Built once at startup and passed by reference.
//! - [`Config`]: the small persisted record the user changes over time
//!   (update interval, auto-update flag, last update time).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default override source
pub const DEFAULT_SOURCE_URL: &str = "https://github-hosts.tinsfox.com/hosts";

/// Version written into freshly created config records
pub const CONFIG_VERSION: &str = "1.0.0";

/// Environment variable naming the hosts file
pub const ENV_HOSTS_FILE: &str = "GITHUB_HOSTS_FILE";

/// Environment variable naming the base directory
pub const ENV_HOME: &str = "GITHUB_HOSTS_HOME";

/// Environment variable naming the override source URL
pub const ENV_SOURCE_URL: &str = "GITHUB_HOSTS_SOURCE_URL";

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux (cron.d)
    Linux,
    /// macOS (launchd)
    MacOs,
    /// Windows (Task Scheduler)
    Windows,
}

impl Platform {
    /// Detect the platform this binary was compiled for
    pub fn detect() -> Result<Self> {
        if cfg!(target_os = "macos") {
            Ok(Self::MacOs)
        } else if cfg!(target_os = "windows") {
            Ok(Self::Windows)
        } else if cfg!(target_os = "linux") {
            Ok(Self::Linux)
        } else {
            Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()))
        }
    }

    /// Default hosts file location
    pub fn default_hosts_file(self) -> PathBuf {
        match self {
            Self::Windows => PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts"),
            Self::Linux | Self::MacOs => PathBuf::from("/etc/hosts"),
        }
    }

    /// File name of the refresh script
    pub fn script_name(self) -> &'static str {
        match self {
            Self::Windows => "update.bat",
            Self::Linux | Self::MacOs => "update.sh",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        })
    }
}

/// Supported refresh intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum UpdateInterval {
    /// Every 30 minutes
    HalfHour,
    /// Every hour
    #[default]
    Hour,
    /// Every two hours
    TwoHours,
}

impl UpdateInterval {
    /// Interval length in minutes
    pub const fn minutes(self) -> u32 {
        match self {
            Self::HalfHour => 30,
            Self::Hour => 60,
            Self::TwoHours => 120,
        }
    }
}

impl TryFrom<u32> for UpdateInterval {
    type Error = Error;

    fn try_from(minutes: u32) -> Result<Self> {
        match minutes {
            30 => Ok(Self::HalfHour),
            60 => Ok(Self::Hour),
            120 => Ok(Self::TwoHours),
            other => Err(Error::UnsupportedInterval(other)),
        }
    }
}

impl From<UpdateInterval> for u32 {
    fn from(interval: UpdateInterval) -> Self {
        interval.minutes()
    }
}

impl fmt::Display for UpdateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} minutes", self.minutes())
    }
}

/// Persisted user configuration
///
/// Components receive this by reference and never mutate it; the caller
/// saves a changed copy once the operation it describes has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Refresh interval
    pub update_interval: UpdateInterval,

    /// Time of the last successful refresh
    pub last_update: DateTime<Utc>,

    /// Record format version
    pub version: String,

    /// Whether a recurring job should be installed
    pub auto_update: bool,
}

impl Config {
    /// Create a fresh record stamped with the current time
    pub fn new(update_interval: UpdateInterval, auto_update: bool) -> Self {
        Self {
            update_interval,
            last_update: Utc::now(),
            version: CONFIG_VERSION.to_string(),
            auto_update,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(UpdateInterval::default(), false)
    }
}

/// Names of the scheduler artifacts owned by this tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTargets {
    /// cron.d file (Linux)
    pub cron_path: PathBuf,

    /// Service reloaded after the cron file changes
    pub cron_service: String,

    /// LaunchDaemon descriptor (macOS)
    pub plist_path: PathBuf,

    /// launchd label
    pub launchd_label: String,

    /// Task Scheduler task name (Windows)
    pub task_name: String,
}

impl Default for JobTargets {
    fn default() -> Self {
        Self {
            cron_path: PathBuf::from("/etc/cron.d/github-hosts"),
            cron_service: "cron".to_string(),
            plist_path: PathBuf::from("/Library/LaunchDaemons/com.github.hosts.plist"),
            launchd_label: "com.github.hosts".to_string(),
            task_name: "GitHubHostsUpdate".to_string(),
        }
    }
}

/// Network verifier tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Per-entry budget for resolution plus the HTTPS probe (in seconds)
    pub timeout_secs: u64,

    /// Maximum number of entries probed at once
    pub max_concurrency: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_verify_timeout_secs(),
            max_concurrency: default_verify_concurrency(),
        }
    }
}

fn default_verify_timeout_secs() -> u64 {
    10
}

fn default_verify_concurrency() -> usize {
    8
}

/// Immutable process-wide settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Host platform; selects the scheduler backend
    pub platform: Platform,

    /// System hosts file
    pub hosts_file: PathBuf,

    /// Base directory (`~/.github-hosts`)
    pub base_dir: PathBuf,

    /// Snapshot directory
    pub backup_dir: PathBuf,

    /// Log directory used by scheduled runs
    pub log_dir: PathBuf,

    /// Persisted [`Config`] file
    pub config_file: PathBuf,

    /// Rendered refresh script
    pub script_path: PathBuf,

    /// Override document URL
    pub source_url: String,

    /// Path of the running executable, invoked by the refresh script
    pub executable: PathBuf,

    /// Scheduler artifact names
    pub targets: JobTargets,

    /// Verifier tuning
    pub verify: VerifyConfig,
}

impl Settings {
    /// Build settings rooted at `base_dir` with platform defaults
    pub fn new(platform: Platform, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            platform,
            hosts_file: platform.default_hosts_file(),
            backup_dir: base_dir.join("backups"),
            log_dir: base_dir.join("logs"),
            config_file: base_dir.join("config.json"),
            script_path: base_dir.join(platform.script_name()),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            executable: PathBuf::from("github-hosts"),
            targets: JobTargets::default(),
            verify: VerifyConfig::default(),
            base_dir,
        }
    }

    /// Override the hosts file
    pub fn with_hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = path.into();
        self
    }

    /// Override the source URL
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    /// Set the executable invoked by scheduled runs
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    /// Override the scheduler artifact names
    pub fn with_targets(mut self, targets: JobTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Override verifier tuning
    pub fn with_verify(mut self, verify: VerifyConfig) -> Self {
        self.verify = verify;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.source_url.is_empty() {
            return Err(Error::config("source URL cannot be empty"));
        }
        if !self.source_url.starts_with("https://") && !self.source_url.starts_with("http://") {
            return Err(Error::config(format!(
                "source URL must use HTTP or HTTPS scheme, got: {}",
                self.source_url
            )));
        }
        if self.verify.timeout_secs == 0 {
            return Err(Error::config("verify timeout must be > 0"));
        }
        if self.verify.max_concurrency == 0 {
            return Err(Error::config("verify concurrency must be > 0"));
        }
        if self.targets.launchd_label.is_empty() || self.targets.task_name.is_empty() {
            return Err(Error::config("scheduler job names cannot be empty"));
        }
        Ok(())
    }
}

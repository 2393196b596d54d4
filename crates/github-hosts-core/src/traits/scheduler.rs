// # Scheduler Trait
//
// Registers the recurring refresh job with the host OS scheduler.
//
// ## Implementations
//
// - cron.d file + cron restart (Linux)
// - LaunchDaemon plist + launchctl (macOS)
// - Task Scheduler via schtasks (Windows)
//
// Each backend owns exactly one artifact. `install` is a destructive
// overwrite: whatever was registered before under the same name is replaced,
// never merged.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Settings, UpdateInterval};
use crate::traits::CommandRunner;

/// What to schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJobSpec {
    /// Run interval in minutes
    pub interval_minutes: u32,
    /// Script the job executes
    pub script_path: PathBuf,
}

impl ScheduledJobSpec {
    /// Spec for one of the supported intervals
    pub fn new(interval: UpdateInterval, script_path: impl Into<PathBuf>) -> Self {
        Self {
            interval_minutes: interval.minutes(),
            script_path: script_path.into(),
        }
    }
}

/// Registration state of the job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Artifact present and registered
    Installed,
    /// No artifact
    NotInstalled,
    /// Artifact present but the scheduler could not confirm it
    Unknown,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Installed => "installed",
            Self::NotInstalled => "not installed",
            Self::Unknown => "unknown",
        })
    }
}

/// Scheduler backend
///
/// # Errors
///
/// - `UnsupportedInterval`: the backend cannot express the interval; nothing
///   was written
/// - `Provisioner`: the OS registration call exited unsuccessfully
/// - `Write`: the artifact could not be written (usually needs root)
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Install or replace the job
    async fn install(&self, spec: &ScheduledJobSpec) -> Result<(), crate::Error>;

    /// Remove the job. Removing a job that does not exist succeeds.
    async fn remove(&self) -> Result<(), crate::Error>;

    /// Inspect the job
    async fn status(&self) -> Result<JobStatus, crate::Error>;

    /// Short backend name (`cron`, `launchd`, `schtasks`)
    fn backend_name(&self) -> &'static str;
}

/// Factory trait for creating schedulers
pub trait SchedulerFactory: Send + Sync {
    /// Create a scheduler for `settings`, shelling out through `runner`
    fn create(
        &self,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Scheduler>, crate::Error>;
}

// # github-hosts-core
//
// Core library for keeping GitHub host overrides in the system hosts file.
//
// ## Architecture Overview
//
// - **hosts**: Entry model, managed block editor and atomic commit
// - **backup**: Timestamped snapshots taken before every hosts write
// - **scheduler**: cron.d, launchd and Task Scheduler backends for the
//   recurring refresh, sharing one refresh script template
// - **registry**: Picks the scheduler backend for the host platform
// - **verify**: Resolves and probes each managed entry concurrently
// - **store**: Persistence for the user's config record
// - **workflow**: `Updater`, which wires the above together
//
// Network and process boundaries are traits (`HostsSource`, `Resolver`,
// `Prober`, `CommandRunner`); the HTTPS implementations live in
// `github-hosts-http`.

pub mod backup;
pub mod config;
pub mod error;
pub mod hosts;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod traits;
pub mod verify;
pub mod workflow;

// Re-export core types for convenience
pub use backup::{BackupRecord, BackupStore};
pub use config::{Config, JobTargets, Platform, Settings, UpdateInterval, VerifyConfig};
pub use error::{Error, Result};
pub use hosts::{HostsDocument, HostsEntry, ManagedBlock};
pub use registry::SchedulerRegistry;
pub use store::{FileConfigStore, MemoryConfigStore};
pub use traits::{CommandRunner, ConfigStore, HostsSource, Prober, Resolver, Scheduler};
pub use verify::{NetworkVerifier, VerificationReport, VerificationResult, VerificationStatus};
pub use workflow::{Diagnostics, InstallStatus, RefreshReport, Updater};

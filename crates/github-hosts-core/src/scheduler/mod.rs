//! Scheduler backends
//!
//! One [`Scheduler`](crate::traits::Scheduler) implementation per platform,
//! all sharing the same [`RefreshScript`]:
//!
//! | Platform | Backend             | Artifact                                      |
//! |----------|---------------------|-----------------------------------------------|
//! | Linux    | [`CronScheduler`]   | `/etc/cron.d/github-hosts`                    |
//! | macOS    | [`LaunchdScheduler`]| `/Library/LaunchDaemons/com.github.hosts.plist` |
//! | Windows  | [`TaskScheduler`]   | task `GitHubHostsUpdate`                      |
//!
//! Backends are selected once at startup through
//! [`SchedulerRegistry`](crate::registry::SchedulerRegistry).

pub mod cron;
pub mod launchd;
pub mod runner;
pub mod script;
pub mod task;

pub use cron::{CronScheduler, CronSchedulerFactory, cron_expression};
pub use launchd::{LaunchdScheduler, LaunchdSchedulerFactory};
pub use runner::SystemCommandRunner;
pub use script::{RefreshScript, ScriptDialect};
pub use task::{TaskScheduler, TaskSchedulerFactory};

pub(crate) fn to_args<'a>(args: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    args.into_iter().map(str::to_string).collect()
}

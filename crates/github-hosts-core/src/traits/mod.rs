//! Core traits for github-hosts
//!
//! Every boundary with the outside world is a trait so the editing and
//! provisioning logic can be exercised without root, network or a real
//! scheduler.
//!
//! - [`HostsSource`]: Fetch the override entries
//! - [`Scheduler`]: Install, remove and inspect the recurring refresh job
//! - [`ConfigStore`]: Persist the user's config record
//! - [`CommandRunner`]: Run OS commands (scheduler registration, DNS flush)
//! - [`Resolver`] / [`Prober`]: Name resolution and HTTPS probing for the verifier

pub mod command;
pub mod config_store;
pub mod hosts_source;
pub mod probe;
pub mod scheduler;

pub use command::{CommandOutput, CommandRunner};
pub use config_store::ConfigStore;
pub use hosts_source::HostsSource;
pub use probe::{ProbeOutcome, Prober, Resolver};
pub use scheduler::{JobStatus, ScheduledJobSpec, Scheduler, SchedulerFactory};

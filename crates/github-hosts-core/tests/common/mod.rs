//! Test doubles and common utilities for contract tests
//!
//! Every double records how it was called through shared counters so a
//! test can keep a handle after boxing the double into an `Updater`.

#![allow(dead_code)]

use github_hosts_core::config::{Config, JobTargets, Platform, Settings};
use github_hosts_core::error::{Error, Result};
use github_hosts_core::hosts::HostsEntry;
use github_hosts_core::traits::{
    CommandOutput, CommandRunner, ConfigStore, HostsSource, JobStatus, ProbeOutcome, Prober, Resolver,
    ScheduledJobSpec, Scheduler,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn entry(address: &str, hostname: &str) -> HostsEntry {
    HostsEntry::new(address, hostname).unwrap()
}

pub fn ip(address: &str) -> IpAddr {
    address.parse().unwrap()
}

/// Temp directory with a hosts file and settings pointing every artifact into it
pub struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Fixture {
    pub fn new(platform: Platform, hosts_content: impl AsRef<[u8]>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let hosts_file = dir.path().join("hosts");
        std::fs::write(&hosts_file, hosts_content.as_ref()).unwrap();

        let targets = JobTargets {
            cron_path: dir.path().join("cron.d").join("github-hosts"),
            cron_service: "cron".to_string(),
            plist_path: dir.path().join("LaunchDaemons").join("com.github.hosts.plist"),
            launchd_label: "com.github.hosts".to_string(),
            task_name: "GitHubHostsUpdate".to_string(),
        };

        let settings = Settings::new(platform, dir.path().join("home"))
            .with_hosts_file(&hosts_file)
            .with_executable("/usr/local/bin/github-hosts")
            .with_targets(targets);

        Self { dir, settings }
    }

    pub fn hosts_path(&self) -> &Path {
        &self.settings.hosts_file
    }

    pub fn hosts(&self) -> String {
        std::fs::read_to_string(&self.settings.hosts_file).unwrap()
    }

    pub fn hosts_bytes(&self) -> Vec<u8> {
        std::fs::read(&self.settings.hosts_file).unwrap()
    }

    pub fn backup_count(&self) -> usize {
        match std::fs::read_dir(&self.settings.backup_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// HostsSource returning a fixed list
#[derive(Clone)]
pub struct StaticSource {
    entries: Vec<HostsEntry>,
    fetch_count: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(entries: Vec<HostsEntry>) -> Self {
        Self {
            entries,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HostsSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<HostsEntry>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// HostsSource that always fails
pub struct FailingSource;

#[async_trait::async_trait]
impl HostsSource for FailingSource {
    async fn fetch(&self) -> Result<Vec<HostsEntry>> {
        Err(Error::fetch("HTTP error: 503 Service Unavailable"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// CommandRunner that records calls; listed programs exit non-zero
#[derive(Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of `program` exit with status 1
    pub fn fail(&self, program: &str) {
        self.failing.lock().unwrap().insert(program.to_string());
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls rendered as `program arg arg`
    pub fn command_lines(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(program, args)| {
                std::iter::once(program)
                    .chain(args)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        if self.failing.lock().unwrap().contains(program) {
            Ok(CommandOutput::failed(1, format!("{program}: simulated failure")))
        } else {
            Ok(CommandOutput::ok(""))
        }
    }
}

/// ConfigStore that loads a fixed record and rejects every save
#[derive(Clone)]
pub struct ReadOnlyStore {
    config: Config,
}

impl ReadOnlyStore {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ConfigStore for ReadOnlyStore {
    async fn load(&self) -> Result<Option<Config>> {
        Ok(Some(self.config.clone()))
    }

    async fn save(&self, _config: &Config) -> Result<()> {
        Err(Error::write(
            "/readonly/config.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        ))
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Scheduler double with shared counters
#[derive(Clone, Default)]
pub struct MockScheduler {
    installs: Arc<Mutex<Vec<ScheduledJobSpec>>>,
    remove_count: Arc<AtomicUsize>,
    fail_install: Arc<AtomicBool>,
    installed: Arc<AtomicBool>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let scheduler = Self::default();
        scheduler.fail_install.store(true, Ordering::SeqCst);
        scheduler
    }

    pub fn installs(&self) -> Vec<ScheduledJobSpec> {
        self.installs.lock().unwrap().clone()
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Scheduler for MockScheduler {
    async fn install(&self, spec: &ScheduledJobSpec) -> Result<()> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(Error::provisioner("mock", "exit status 1"));
        }
        self.installs.lock().unwrap().push(spec.clone());
        self.installed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.remove_count.fetch_add(1, Ordering::SeqCst);
        self.installed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> Result<JobStatus> {
        Ok(if self.installed.load(Ordering::SeqCst) {
            JobStatus::Installed
        } else {
            JobStatus::NotInstalled
        })
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Resolver answering from a table; unknown hosts fail
#[derive(Clone, Default)]
pub struct MockResolver {
    answers: Arc<HashMap<String, (Duration, Vec<IpAddr>)>>,
}

impl MockResolver {
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self::with_delays(
            &answers
                .iter()
                .map(|(host, address)| (*host, *address, Duration::ZERO))
                .collect::<Vec<_>>(),
        )
    }

    pub fn with_delays(answers: &[(&str, &str, Duration)]) -> Self {
        let answers = answers
            .iter()
            .map(|(host, address, delay)| (host.to_string(), (*delay, vec![ip(address)])))
            .collect();
        Self {
            answers: Arc::new(answers),
        }
    }
}

#[async_trait::async_trait]
impl Resolver for MockResolver {
    async fn resolve(&self, hostname: &str) -> std::io::Result<Vec<IpAddr>> {
        match self.answers.get(hostname) {
            Some((delay, addresses)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(addresses.clone())
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such host: {hostname}"),
            )),
        }
    }
}

/// Prober with per-host outcomes and delays, tracking concurrency
#[derive(Clone, Default)]
pub struct MockProber {
    outcomes: Arc<HashMap<String, (Duration, ProbeOutcome)>>,
    default_delay: Duration,
    probe_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProber {
    /// Every host answers 200 unless listed
    pub fn new(outcomes: &[(&str, ProbeOutcome, Duration)]) -> Self {
        let outcomes = outcomes
            .iter()
            .map(|(host, outcome, delay)| (host.to_string(), (*delay, outcome.clone())))
            .collect();
        Self {
            outcomes: Arc::new(outcomes),
            ..Self::default()
        }
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Prober for MockProber {
    async fn probe(&self, hostname: &str) -> ProbeOutcome {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, outcome) = self
            .outcomes
            .get(hostname)
            .cloned()
            .unwrap_or((self.default_delay, ProbeOutcome::Status(200)));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

//! Update workflow
//!
//! [`Updater`] wires the components together and owns the ordering rules:
//!
//! - a snapshot is taken before every write to the hosts file
//! - nothing is backed up or written when parsing or fetching fails
//! - config changes are saved only after the scheduler call succeeded
//! - a failed DNS cache flush or `lastUpdate` save after a successful
//!   write is reported in [`RefreshReport`], never an error
//!
//! ```text
//! read hosts ─► parse ─► fetch ─► snapshot ─► install ─► commit ─► flush DNS
//!                 │         │
//!                 └─────────┴──► abort, file untouched
//! ```

pub mod diagnose;
pub mod dns_cache;

pub use diagnose::{ConfigStatus, DirectoryCheck, DirectoryStatus, Diagnostics, HostsFileStatus};
pub use dns_cache::flush_dns_cache;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::backup::{BackupRecord, BackupStore};
use crate::config::{Config, Settings, UpdateInterval};
use crate::error::{Error, Result};
use crate::hosts::{HostsDocument, commit};
use crate::traits::{
    CommandRunner, ConfigStore, HostsSource, JobStatus, ScheduledJobSpec, Scheduler,
};
use crate::verify::{NetworkVerifier, VerificationReport};

/// Outcome of a successful refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries written into the block
    pub entries: usize,
    /// Snapshot taken before the write
    pub backup: BackupRecord,
    /// Timestamp stamped into the block
    pub updated_at: DateTime<Utc>,
    /// Whether the DNS cache flush succeeded
    pub dns_flushed: bool,
    /// Whether `lastUpdate` was saved; `None` when no config record exists
    pub config_saved: Option<bool>,
}

/// Snapshot of the installation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStatus {
    /// Saved config, if any
    pub config: Option<Config>,
    /// Scheduler backend name
    pub backend: &'static str,
    /// Scheduled job state
    pub job: JobStatus,
    /// Number of entries in the managed block
    pub managed_entries: usize,
    /// Timestamp comment of the managed block
    pub block_updated: Option<String>,
}

/// Orchestrates hosts edits, backups, scheduling and verification
pub struct Updater {
    settings: Settings,
    source: Box<dyn HostsSource>,
    scheduler: Box<dyn Scheduler>,
    store: Box<dyn ConfigStore>,
    runner: Arc<dyn CommandRunner>,
    verifier: NetworkVerifier,
    backups: BackupStore,
}

impl Updater {
    /// Create an updater
    ///
    /// # Errors
    ///
    /// `Config` if `settings` does not validate.
    pub fn new(
        settings: Settings,
        source: Box<dyn HostsSource>,
        scheduler: Box<dyn Scheduler>,
        store: Box<dyn ConfigStore>,
        runner: Arc<dyn CommandRunner>,
        verifier: NetworkVerifier,
    ) -> Result<Self> {
        settings.validate()?;
        let backups = BackupStore::new(settings.backup_dir.clone());
        Ok(Self {
            settings,
            source,
            scheduler,
            store,
            runner,
            verifier,
            backups,
        })
    }

    /// Settings this updater was built with
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Backup store rooted at the configured backup directory
    pub fn backup_store(&self) -> &BackupStore {
        &self.backups
    }

    async fn read_document(&self) -> Result<HostsDocument> {
        let path = &self.settings.hosts_file;
        let content = fs::read(path)
            .await
            .map_err(|e| Error::read(path, e))?;
        HostsDocument::parse(&content)
    }

    async fn flush_dns(&self) -> bool {
        match flush_dns_cache(self.settings.platform, self.runner.as_ref()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Hosts file updated but the DNS cache could not be flushed");
                false
            }
        }
    }

    async fn record_last_update(&self, updated_at: DateTime<Utc>) -> Option<bool> {
        let mut config = match self.store.load().await {
            Ok(Some(config)) => config,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load config");
                return Some(false);
            }
        };

        config.last_update = updated_at;
        match self.store.save(&config).await {
            Ok(()) => Some(true),
            Err(e) => {
                tracing::warn!(error = %e, "Hosts file updated but the last update time was not saved");
                Some(false)
            }
        }
    }

    /// Fetch fresh entries and install them into the managed block
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let document = self.read_document().await?;

        tracing::info!(source = %self.source.describe(), "Fetching hosts entries");
        let entries = self.source.fetch().await?;
        if entries.is_empty() {
            return Err(Error::fetch("source returned no entries"));
        }

        let backup = self.backups.snapshot(&self.settings.hosts_file).await?;

        let updated_at = Utc::now();
        let updated = document.install(&entries, updated_at);
        commit(&self.settings.hosts_file, updated.render()).await?;

        tracing::info!(
            path = %self.settings.hosts_file.display(),
            entries = entries.len(),
            "Updated managed block"
        );

        let config_saved = self.record_last_update(updated_at).await;
        let dns_flushed = self.flush_dns().await;

        Ok(RefreshReport {
            entries: entries.len(),
            backup,
            updated_at,
            dns_flushed,
            config_saved,
        })
    }

    /// Remove the managed block. Without a block nothing is backed up or written.
    pub async fn clean(&self) -> Result<Option<BackupRecord>> {
        let document = self.read_document().await?;
        if !document.has_block() {
            tracing::info!("No managed block present, nothing to clean");
            return Ok(None);
        }

        let backup = self.backups.snapshot(&self.settings.hosts_file).await?;
        commit(&self.settings.hosts_file, document.remove().render()).await?;
        tracing::info!(path = %self.settings.hosts_file.display(), "Removed managed block");

        self.flush_dns().await;
        Ok(Some(backup))
    }

    /// All backups, newest first
    pub async fn backups(&self) -> Result<Vec<BackupRecord>> {
        self.backups.list().await
    }

    /// Snapshot the hosts file now
    pub async fn create_backup(&self) -> Result<BackupRecord> {
        self.backups.snapshot(&self.settings.hosts_file).await
    }

    /// Restore the hosts file from the named backup.
    ///
    /// Returns the snapshot taken of the file just before it was overwritten.
    pub async fn restore(&self, name: &str) -> Result<BackupRecord> {
        let record = self.backups.find(name).await?;
        let safety = self.backups.restore(&record, &self.settings.hosts_file).await?;
        self.flush_dns().await;
        Ok(safety)
    }

    /// Delete the named backup
    pub async fn delete_backup(&self, name: &str) -> Result<()> {
        let record = self.backups.find(name).await?;
        self.backups.delete(&record).await
    }

    async fn current_config(&self) -> Result<Config> {
        Ok(self.store.load().await?.unwrap_or_default())
    }

    fn job_spec(&self, interval: UpdateInterval) -> ScheduledJobSpec {
        ScheduledJobSpec::new(interval, self.settings.script_path.clone())
    }

    /// Install the recurring job and record it in config.
    ///
    /// The config is saved only after the scheduler accepted the job, so a
    /// failure leaves the previous `autoUpdate` value in place.
    pub async fn enable_auto_update(&self, interval: UpdateInterval) -> Result<Config> {
        let mut config = self.current_config().await?;

        if let Err(e) = self.scheduler.install(&self.job_spec(interval)).await {
            tracing::error!(
                backend = self.scheduler.backend_name(),
                error = %e,
                "Failed to install scheduled job, auto-update left unchanged"
            );
            return Err(e);
        }

        config.auto_update = true;
        config.update_interval = interval;
        self.store.save(&config).await?;
        Ok(config)
    }

    /// Remove the recurring job and record it in config
    pub async fn disable_auto_update(&self) -> Result<Config> {
        let mut config = self.current_config().await?;
        self.scheduler.remove().await?;

        config.auto_update = false;
        self.store.save(&config).await?;
        Ok(config)
    }

    /// Change the interval, reinstalling the job if auto-update is on
    pub async fn change_interval(&self, interval: UpdateInterval) -> Result<Config> {
        let mut config = self.current_config().await?;
        if config.auto_update {
            self.scheduler.install(&self.job_spec(interval)).await?;
        }

        config.update_interval = interval;
        self.store.save(&config).await?;
        Ok(config)
    }

    /// Current installation state
    pub async fn status(&self) -> Result<InstallStatus> {
        let document = self.read_document().await?;
        Ok(InstallStatus {
            config: self.store.load().await?,
            backend: self.scheduler.backend_name(),
            job: self.scheduler.status().await?,
            managed_entries: document.managed_entries().len(),
            block_updated: document.block.and_then(|block| block.updated),
        })
    }

    /// Verify every managed entry against the network
    pub async fn verify(&self) -> Result<VerificationReport> {
        let document = self.read_document().await?;
        let entries = NetworkVerifier::plan(&document)?;
        tracing::info!(entries = entries.len(), "Verifying managed entries");
        Ok(self.verifier.verify_all(&entries).await)
    }

    /// Check directories, the hosts file and the config record
    pub async fn diagnose(&self) -> Diagnostics {
        let mut directories = Vec::new();
        for (role, path) in [
            ("base", &self.settings.base_dir),
            ("backups", &self.settings.backup_dir),
            ("logs", &self.settings.log_dir),
        ] {
            directories.push(DirectoryCheck {
                role,
                path: path.clone(),
                status: diagnose::check_directory(path).await,
            });
        }

        let hosts = match self.read_document().await {
            Ok(document) => HostsFileStatus::Ok {
                managed_entries: document.managed_entries().len(),
                writable: diagnose::is_writable(&self.settings.hosts_file).await,
            },
            Err(e @ Error::MalformedBlock(_)) => HostsFileStatus::Malformed(e.to_string()),
            Err(e) => HostsFileStatus::Unreadable(e.to_string()),
        };

        let config = match self.store.load().await {
            Ok(Some(config)) => ConfigStatus::Ok(config),
            Ok(None) => ConfigStatus::Missing,
            Err(e) => ConfigStatus::Unreadable(e.to_string()),
        };

        Diagnostics {
            platform: self.settings.platform,
            backend: self.scheduler.backend_name(),
            hosts_file: self.settings.hosts_file.clone(),
            hosts,
            directories,
            config,
        }
    }

    /// Write the config record to `config_export_<timestamp>.json` in the
    /// base directory
    ///
    /// # Errors
    ///
    /// `Config` when there is no record to export.
    pub async fn export_config(&self) -> Result<PathBuf> {
        let config = self
            .store
            .load()
            .await?
            .ok_or_else(|| Error::config("no config to export"))?;

        fs::create_dir_all(&self.settings.base_dir)
            .await
            .map_err(|e| Error::write(&self.settings.base_dir, e))?;
        let path = self.settings.base_dir.join(format!(
            "config_export_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        commit(&path, serde_json::to_vec_pretty(&config)?).await?;

        tracing::info!(path = %path.display(), "Exported config");
        Ok(path)
    }

    /// Load a config record from `path` and make it current.
    ///
    /// The scheduled job is brought in line with the imported `autoUpdate`
    /// flag before the record is saved.
    pub async fn import_config(&self, path: &Path) -> Result<Config> {
        let data = fs::read(path).await.map_err(|e| Error::read(path, e))?;
        let config: Config = serde_json::from_slice(&data)?;

        if config.auto_update {
            self.scheduler
                .install(&self.job_spec(config.update_interval))
                .await?;
        } else {
            self.scheduler.remove().await?;
        }
        self.store.save(&config).await?;

        tracing::info!(path = %path.display(), auto_update = config.auto_update, "Imported config");
        Ok(config)
    }

    /// Remove everything this tool installed except the backups
    pub async fn uninstall(&self) -> Result<()> {
        self.clean().await?;
        self.scheduler.remove().await?;

        match fs::remove_file(&self.settings.script_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::write(&self.settings.script_path, e)),
        }
        self.store.clear().await?;

        tracing::info!(
            backups = %self.settings.backup_dir.display(),
            "Uninstalled; backups were kept"
        );
        Ok(())
    }
}

// # cron.d Scheduler
//
// Linux backend. Owns a single file under /etc/cron.d holding one line:
//
// ```text
// 0 * * * * root /root/.github-hosts/update.sh > /dev/null 2>&1
// ```
//
// The refresh script appends its own output to the log directory, so cron
// discards whatever reaches it.
//
// Only the three supported intervals map to a cron expression; anything
// else is rejected before any file is touched.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use super::script::{RefreshScript, set_mode};
use super::to_args;
use crate::config::{Settings, UpdateInterval};
use crate::error::{Error, Result};
use crate::hosts::commit;
use crate::traits::{CommandRunner, JobStatus, ScheduledJobSpec, Scheduler, SchedulerFactory};

const BACKEND: &str = "cron";

/// Cron schedule expression for a supported interval
pub fn cron_expression(interval_minutes: u32) -> Result<&'static str> {
    match UpdateInterval::try_from(interval_minutes)? {
        UpdateInterval::HalfHour => Ok("*/30 * * * *"),
        UpdateInterval::Hour => Ok("0 * * * *"),
        UpdateInterval::TwoHours => Ok("0 */2 * * *"),
    }
}

/// cron.d backend
pub struct CronScheduler {
    cron_path: PathBuf,
    service: String,
    script: RefreshScript,
    runner: Arc<dyn CommandRunner>,
}

impl CronScheduler {
    /// Create the backend from settings
    pub fn new(settings: &Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            cron_path: settings.targets.cron_path.clone(),
            service: settings.targets.cron_service.clone(),
            script: RefreshScript::from_settings(settings),
            runner,
        }
    }

    /// Render the cron.d file content
    pub fn render_line(&self, spec: &ScheduledJobSpec) -> Result<String> {
        let schedule = cron_expression(spec.interval_minutes)?;
        Ok(format!(
            "{schedule} root {} > /dev/null 2>&1\n",
            spec.script_path.display()
        ))
    }

    async fn reload(&self) -> Result<()> {
        let output = self
            .runner
            .run("systemctl", &to_args(["restart", self.service.as_str()]))
            .await?;
        if !output.success {
            return Err(Error::provisioner(BACKEND, output.combined()));
        }
        Ok(())
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn install(&self, spec: &ScheduledJobSpec) -> Result<()> {
        let line = self.render_line(spec)?;

        self.script.write(&spec.script_path).await?;

        if let Some(parent) = self.cron_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::write(parent, e))?;
        }
        commit(&self.cron_path, line).await?;
        set_mode(&self.cron_path, 0o644).await?;

        self.reload().await?;

        tracing::info!(
            backend = BACKEND,
            path = %self.cron_path.display(),
            interval = spec.interval_minutes,
            "Installed scheduled job"
        );
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.cron_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.cron_path.display(), "No cron file to remove");
                return Ok(());
            }
            Err(e) => return Err(Error::write(&self.cron_path, e)),
        }

        // cron rereads cron.d on its own; the restart only makes it immediate
        if let Err(e) = self.reload().await {
            tracing::warn!(backend = BACKEND, error = %e, "Failed to restart cron after removal");
        }

        tracing::info!(backend = BACKEND, path = %self.cron_path.display(), "Removed scheduled job");
        Ok(())
    }

    async fn status(&self) -> Result<JobStatus> {
        match fs::read_to_string(&self.cron_path).await {
            Ok(content) if content.lines().any(|line| line.contains(" root ")) => {
                Ok(JobStatus::Installed)
            }
            Ok(_) => Ok(JobStatus::Unknown),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JobStatus::NotInstalled),
            Err(e) => Err(Error::read(&self.cron_path, e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

/// Factory for [`CronScheduler`]
pub struct CronSchedulerFactory;

impl SchedulerFactory for CronSchedulerFactory {
    fn create(
        &self,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Scheduler>> {
        Ok(Box::new(CronScheduler::new(settings, runner)))
    }
}

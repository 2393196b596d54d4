// # launchd Scheduler
//
// macOS backend. Registers a LaunchDaemon under a fixed label.
//
// launchd refuses to bootstrap a label that is already loaded, so install
// always boots the old job out and deletes its plist before writing the
// new one. The plist sets no StandardOutPath: the refresh script writes
// its own log.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use super::script::{RefreshScript, set_mode};
use super::to_args;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::hosts::commit;
use crate::traits::{CommandRunner, JobStatus, ScheduledJobSpec, Scheduler, SchedulerFactory};

const BACKEND: &str = "launchd";

/// LaunchDaemon backend
pub struct LaunchdScheduler {
    plist_path: PathBuf,
    label: String,
    script: RefreshScript,
    runner: Arc<dyn CommandRunner>,
}

impl LaunchdScheduler {
    /// Create the backend from settings
    pub fn new(settings: &Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            plist_path: settings.targets.plist_path.clone(),
            label: settings.targets.launchd_label.clone(),
            script: RefreshScript::from_settings(settings),
            runner,
        }
    }

    fn service_target(&self) -> String {
        format!("system/{}", self.label)
    }

    /// Render the plist descriptor
    pub fn render_plist(&self, spec: &ScheduledJobSpec) -> Result<String> {
        if spec.interval_minutes == 0 {
            return Err(Error::UnsupportedInterval(0));
        }
        let seconds = u64::from(spec.interval_minutes) * 60;

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>/bin/sh</string>
        <string>{script}</string>
    </array>
    <key>StartInterval</key>
    <integer>{seconds}</integer>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
            script = xml_escape(&spec.script_path.display().to_string()),
        ))
    }

    async fn bootout(&self) {
        let target = self.service_target();
        match self
            .runner
            .run("launchctl", &to_args(["bootout", target.as_str()]))
            .await
        {
            Ok(output) if !output.success => {
                tracing::debug!(label = %self.label, output = %output.combined(), "bootout reported failure (job not loaded)");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(label = %self.label, error = %e, "bootout failed"),
        }
    }
}

#[async_trait]
impl Scheduler for LaunchdScheduler {
    async fn install(&self, spec: &ScheduledJobSpec) -> Result<()> {
        let plist = self.render_plist(spec)?;

        self.script.write(&spec.script_path).await?;

        self.bootout().await;
        remove_if_exists(&self.plist_path).await?;

        if let Some(parent) = self.plist_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::write(parent, e))?;
        }
        commit(&self.plist_path, plist).await?;
        set_mode(&self.plist_path, 0o644).await?;

        let plist_path = self.plist_path.display().to_string();
        let output = self
            .runner
            .run("launchctl", &to_args(["bootstrap", "system", plist_path.as_str()]))
            .await?;
        if !output.success {
            return Err(Error::provisioner(BACKEND, output.combined()));
        }

        tracing::info!(
            backend = BACKEND,
            label = %self.label,
            interval = spec.interval_minutes,
            "Installed scheduled job"
        );
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.bootout().await;
        remove_if_exists(&self.plist_path).await?;
        tracing::info!(backend = BACKEND, label = %self.label, "Removed scheduled job");
        Ok(())
    }

    async fn status(&self) -> Result<JobStatus> {
        match fs::metadata(&self.plist_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(JobStatus::NotInstalled),
            Err(e) => return Err(Error::read(&self.plist_path, e)),
        }

        let target = self.service_target();
        let output = self
            .runner
            .run("launchctl", &to_args(["print", target.as_str()]))
            .await?;
        Ok(if output.success {
            JobStatus::Installed
        } else {
            JobStatus::Unknown
        })
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

/// Factory for [`LaunchdScheduler`]
pub struct LaunchdSchedulerFactory;

impl SchedulerFactory for LaunchdSchedulerFactory {
    fn create(
        &self,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Scheduler>> {
        Ok(Box::new(LaunchdScheduler::new(settings, runner)))
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::write(path, e)),
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_handles_markup() {
        assert_eq!(xml_escape("a&b<c>"), "a&amp;b&lt;c&gt;");
    }
}

// # Task Scheduler Backend
//
// Windows backend driven through schtasks.exe. The task runs the batch
// script as SYSTEM at the highest run level, repeating every N minutes.

use async_trait::async_trait;
use std::sync::Arc;

use super::script::RefreshScript;
use super::to_args;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::traits::{CommandRunner, JobStatus, ScheduledJobSpec, Scheduler, SchedulerFactory};

const BACKEND: &str = "schtasks";
const SCHTASKS: &str = "schtasks";

/// Task Scheduler backend
pub struct TaskScheduler {
    task_name: String,
    script: RefreshScript,
    runner: Arc<dyn CommandRunner>,
}

impl TaskScheduler {
    /// Create the backend from settings
    pub fn new(settings: &Settings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            task_name: settings.targets.task_name.clone(),
            script: RefreshScript::from_settings(settings),
            runner,
        }
    }

    /// Arguments of the `schtasks /create` call
    pub fn create_args(&self, spec: &ScheduledJobSpec) -> Result<Vec<String>> {
        if spec.interval_minutes == 0 {
            return Err(Error::UnsupportedInterval(0));
        }
        let command = format!("\"{}\"", spec.script_path.display());
        let modifier = spec.interval_minutes.to_string();
        Ok(to_args([
            "/create",
            "/tn",
            self.task_name.as_str(),
            "/tr",
            command.as_str(),
            "/sc",
            "minute",
            "/mo",
            modifier.as_str(),
            "/ru",
            "SYSTEM",
            "/rl",
            "HIGHEST",
            "/f",
        ]))
    }

    async fn delete(&self) -> Result<bool> {
        let output = self
            .runner
            .run(SCHTASKS, &to_args(["/delete", "/tn", self.task_name.as_str(), "/f"]))
            .await?;
        if !output.success {
            tracing::debug!(task = %self.task_name, output = %output.combined(), "schtasks /delete failed");
        }
        Ok(output.success)
    }
}

#[async_trait]
impl Scheduler for TaskScheduler {
    async fn install(&self, spec: &ScheduledJobSpec) -> Result<()> {
        let args = self.create_args(spec)?;

        self.script.write(&spec.script_path).await?;

        // A missing task makes /delete fail; that is expected here
        self.delete().await?;

        let output = self.runner.run(SCHTASKS, &args).await?;
        if !output.success {
            return Err(Error::provisioner(BACKEND, output.combined()));
        }

        tracing::info!(
            backend = BACKEND,
            task = %self.task_name,
            interval = spec.interval_minutes,
            "Installed scheduled job"
        );
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        if !self.delete().await? && self.status().await? != JobStatus::NotInstalled {
            return Err(Error::provisioner(
                BACKEND,
                format!("task {} could not be deleted", self.task_name),
            ));
        }
        tracing::info!(backend = BACKEND, task = %self.task_name, "Removed scheduled job");
        Ok(())
    }

    async fn status(&self) -> Result<JobStatus> {
        let output = self
            .runner
            .run(SCHTASKS, &to_args(["/query", "/tn", self.task_name.as_str()]))
            .await?;
        Ok(if output.success {
            JobStatus::Installed
        } else {
            JobStatus::NotInstalled
        })
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

/// Factory for [`TaskScheduler`]
pub struct TaskSchedulerFactory;

impl SchedulerFactory for TaskSchedulerFactory {
    fn create(
        &self,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Scheduler>> {
        Ok(Box::new(TaskScheduler::new(settings, runner)))
    }
}

//! Contract Test: Scheduler Backends
//!
//! Each backend owns exactly one artifact and drives the platform tool
//! through `CommandRunner`.
//!
//! Constraints verified:
//! - Unsupported intervals are rejected before anything is written or run
//! - Install replaces a previous registration instead of stacking a second one
//! - A non-zero exit from the platform tool surfaces as `Provisioner`
//! - Removing an absent job succeeds

mod common;

use common::*;
use github_hosts_core::config::Platform;
use github_hosts_core::traits::{CommandRunner, JobStatus, ScheduledJobSpec, Scheduler};
use github_hosts_core::{Error, SchedulerRegistry, UpdateInterval};
use std::sync::Arc;

fn backend(fixture: &Fixture, runner: &RecordingRunner) -> Box<dyn Scheduler> {
    let runner: Arc<dyn CommandRunner> = Arc::new(runner.clone());
    SchedulerRegistry::with_defaults()
        .create(&fixture.settings, runner)
        .unwrap()
}

fn spec(fixture: &Fixture, interval: UpdateInterval) -> ScheduledJobSpec {
    ScheduledJobSpec::new(interval, &fixture.settings.script_path)
}

// ============================================================================
// cron.d
// ============================================================================

#[tokio::test]
async fn cron_install_writes_line_script_and_restarts_service() {
    let fixture = Fixture::new(Platform::Linux, "127.0.0.1 localhost\n");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);
    assert_eq!(scheduler.backend_name(), "cron");

    scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await
        .unwrap();

    let cron = std::fs::read_to_string(&fixture.settings.targets.cron_path).unwrap();
    let expected = format!(
        "0 * * * * root {} > /dev/null 2>&1\n",
        fixture.settings.script_path.display()
    );
    assert_eq!(cron, expected);

    let script = std::fs::read_to_string(&fixture.settings.script_path).unwrap();
    assert!(script.starts_with("#!/bin/sh"));
    assert!(script.contains("update"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&fixture.settings.script_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    assert_eq!(runner.command_lines(), vec!["systemctl restart cron"]);
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::Installed);
}

#[tokio::test]
async fn cron_reinstall_replaces_line() {
    let fixture = Fixture::new(Platform::Linux, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);

    scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await
        .unwrap();
    scheduler
        .install(&spec(&fixture, UpdateInterval::HalfHour))
        .await
        .unwrap();

    let cron = std::fs::read_to_string(&fixture.settings.targets.cron_path).unwrap();
    assert_eq!(cron.lines().count(), 1);
    assert!(cron.starts_with("*/30 * * * * root "));
}

#[tokio::test]
async fn cron_rejects_unsupported_interval_before_writing() {
    let fixture = Fixture::new(Platform::Linux, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);

    let odd = ScheduledJobSpec {
        interval_minutes: 45,
        script_path: fixture.settings.script_path.clone(),
    };
    let result = scheduler.install(&odd).await;

    assert!(matches!(result, Err(Error::UnsupportedInterval(45))));
    assert!(!fixture.settings.targets.cron_path.exists());
    assert!(!fixture.settings.script_path.exists());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn cron_restart_failure_is_provisioner_error() {
    let fixture = Fixture::new(Platform::Linux, "");
    let runner = RecordingRunner::new();
    runner.fail("systemctl");
    let scheduler = backend(&fixture, &runner);

    let result = scheduler
        .install(&spec(&fixture, UpdateInterval::TwoHours))
        .await;

    assert!(matches!(
        result,
        Err(Error::Provisioner { backend: "cron", .. })
    ));
}

#[tokio::test]
async fn cron_remove_is_idempotent() {
    let fixture = Fixture::new(Platform::Linux, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);

    scheduler.remove().await.unwrap();
    assert!(runner.calls().is_empty());
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::NotInstalled);

    scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await
        .unwrap();
    scheduler.remove().await.unwrap();
    scheduler.remove().await.unwrap();

    assert!(!fixture.settings.targets.cron_path.exists());
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::NotInstalled);
}

// ============================================================================
// launchd
// ============================================================================

#[tokio::test]
async fn launchd_install_boots_out_then_bootstraps() {
    let fixture = Fixture::new(Platform::MacOs, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);
    assert_eq!(scheduler.backend_name(), "launchd");

    scheduler
        .install(&spec(&fixture, UpdateInterval::HalfHour))
        .await
        .unwrap();

    let plist_path = &fixture.settings.targets.plist_path;
    let plist = std::fs::read_to_string(plist_path).unwrap();
    assert!(plist.contains("<string>com.github.hosts</string>"));
    assert!(plist.contains("<key>StartInterval</key>\n    <integer>1800</integer>"));
    assert!(!plist.contains("StandardOutPath"));
    assert!(!plist.contains("update.log"));
    assert!(plist.contains(&format!(
        "<string>{}</string>",
        fixture.settings.script_path.display()
    )));

    assert_eq!(
        runner.command_lines(),
        vec![
            "launchctl bootout system/com.github.hosts".to_string(),
            format!("launchctl bootstrap system {}", plist_path.display()),
        ]
    );
}

#[tokio::test]
async fn launchd_bootstrap_failure_is_provisioner_error() {
    let fixture = Fixture::new(Platform::MacOs, "");
    let runner = RecordingRunner::new();
    runner.fail("launchctl");
    let scheduler = backend(&fixture, &runner);

    let result = scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await;

    assert!(matches!(
        result,
        Err(Error::Provisioner { backend: "launchd", .. })
    ));
}

#[tokio::test]
async fn launchd_remove_deletes_plist() {
    let fixture = Fixture::new(Platform::MacOs, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);

    scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await
        .unwrap();
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::Installed);

    scheduler.remove().await.unwrap();
    assert!(!fixture.settings.targets.plist_path.exists());
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::NotInstalled);

    // Absent job: bootout fails quietly, no plist to delete
    runner.fail("launchctl");
    scheduler.remove().await.unwrap();
}

// ============================================================================
// Task Scheduler
// ============================================================================

#[tokio::test]
async fn schtasks_install_deletes_then_creates() {
    let fixture = Fixture::new(Platform::Windows, "");
    let runner = RecordingRunner::new();
    let scheduler = backend(&fixture, &runner);
    assert_eq!(scheduler.backend_name(), "schtasks");

    scheduler
        .install(&spec(&fixture, UpdateInterval::TwoHours))
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "schtasks");
    assert_eq!(calls[0].1, vec!["/delete", "/tn", "GitHubHostsUpdate", "/f"]);
    assert_eq!(
        calls[1].1,
        vec![
            "/create".to_string(),
            "/tn".to_string(),
            "GitHubHostsUpdate".to_string(),
            "/tr".to_string(),
            format!("\"{}\"", fixture.settings.script_path.display()),
            "/sc".to_string(),
            "minute".to_string(),
            "/mo".to_string(),
            "120".to_string(),
            "/ru".to_string(),
            "SYSTEM".to_string(),
            "/rl".to_string(),
            "HIGHEST".to_string(),
            "/f".to_string(),
        ]
    );

    let script = std::fs::read_to_string(&fixture.settings.script_path).unwrap();
    assert!(script.starts_with("@echo off\r\n"));
}

#[tokio::test]
async fn schtasks_create_failure_is_provisioner_error() {
    let fixture = Fixture::new(Platform::Windows, "");
    let runner = RecordingRunner::new();
    runner.fail("schtasks");
    let scheduler = backend(&fixture, &runner);

    let result = scheduler
        .install(&spec(&fixture, UpdateInterval::Hour))
        .await;

    assert!(matches!(
        result,
        Err(Error::Provisioner { backend: "schtasks", .. })
    ));
}

#[tokio::test]
async fn schtasks_remove_of_absent_task_succeeds() {
    let fixture = Fixture::new(Platform::Windows, "");
    let runner = RecordingRunner::new();
    runner.fail("schtasks");
    let scheduler = backend(&fixture, &runner);

    scheduler.remove().await.unwrap();
    assert_eq!(scheduler.status().await.unwrap(), JobStatus::NotInstalled);
}

//! Refresh script rendering
//!
//! Every backend schedules the same script. It pins the settings the
//! interactive run used (hosts file, base directory, source URL) and calls
//! the tool's own `update` command, so a scheduled refresh behaves exactly
//! like a manual one.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::{ENV_HOME, ENV_HOSTS_FILE, ENV_SOURCE_URL, Platform, Settings};
use crate::error::{Error, Result};
use crate::hosts::commit;

/// Script language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDialect {
    /// POSIX shell (cron, launchd)
    Shell,
    /// cmd.exe batch (Task Scheduler)
    Batch,
}

impl ScriptDialect {
    /// Dialect the platform's scheduler runs
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self::Batch,
            Platform::Linux | Platform::MacOs => Self::Shell,
        }
    }

    fn preamble(self) -> &'static [&'static str] {
        match self {
            Self::Shell => &["#!/bin/sh", "# Generated by github-hosts; changes are overwritten."],
            Self::Batch => &["@echo off", "rem Generated by github-hosts; changes are overwritten."],
        }
    }

    fn set_var(self, name: &str, value: &str) -> String {
        match self {
            Self::Shell => format!("export {name}={}", shell_quote(value)),
            Self::Batch => format!("set \"{name}={value}\""),
        }
    }

    fn ensure_dir(self, dir: &str) -> String {
        match self {
            Self::Shell => format!("mkdir -p {}", shell_quote(dir)),
            Self::Batch => format!("if not exist \"{dir}\" mkdir \"{dir}\""),
        }
    }

    fn invoke(self, executable: &str, command: &str, log_file: &str) -> String {
        match self {
            Self::Shell => format!(
                "{} {command} >> {} 2>&1",
                shell_quote(executable),
                shell_quote(log_file)
            ),
            Self::Batch => format!("\"{executable}\" {command} >> \"{log_file}\" 2>&1"),
        }
    }

    fn line_ending(self) -> &'static str {
        match self {
            Self::Shell => "\n",
            Self::Batch => "\r\n",
        }
    }
}

/// The refresh script, ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshScript {
    dialect: ScriptDialect,
    executable: PathBuf,
    hosts_file: PathBuf,
    base_dir: PathBuf,
    log_dir: PathBuf,
    source_url: String,
}

impl RefreshScript {
    /// Script for `settings` in the platform's dialect
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            dialect: ScriptDialect::for_platform(settings.platform),
            executable: settings.executable.clone(),
            hosts_file: settings.hosts_file.clone(),
            base_dir: settings.base_dir.clone(),
            log_dir: settings.log_dir.clone(),
            source_url: settings.source_url.clone(),
        }
    }

    /// Dialect this script renders in
    pub fn dialect(&self) -> ScriptDialect {
        self.dialect
    }

    /// Render the script text
    pub fn render(&self) -> String {
        let d = self.dialect;
        let log_dir = self.log_dir.display().to_string();
        let log_file = self.log_dir.join("update.log").display().to_string();

        let mut lines: Vec<String> = d.preamble().iter().map(|l| l.to_string()).collect();
        lines.push(d.set_var(ENV_HOSTS_FILE, &self.hosts_file.display().to_string()));
        lines.push(d.set_var(ENV_HOME, &self.base_dir.display().to_string()));
        lines.push(d.set_var(ENV_SOURCE_URL, &self.source_url));
        lines.push(d.ensure_dir(&log_dir));
        lines.push(d.invoke(&self.executable.display().to_string(), "update", &log_file));

        let newline = d.line_ending();
        let mut script = lines.join(newline);
        script.push_str(newline);
        script
    }

    /// Write the script to `path` and make it executable
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::write(parent, e))?;
            }
        }
        fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|e| Error::write(&self.log_dir, e))?;

        commit(path, self.render()).await?;
        set_mode(path, 0o755).await?;

        tracing::debug!(path = %path.display(), dialect = ?self.dialect, "Wrote refresh script");
        Ok(())
    }
}

/// Set unix permission bits; no-op elsewhere
#[cfg(unix)]
pub(crate) async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| Error::write(path, e))
}

/// Set unix permission bits; no-op elsewhere
#[cfg(not(unix))]
pub(crate) async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(platform: Platform) -> Settings {
        Settings::new(platform, "/opt/gh")
            .with_hosts_file("/etc/hosts")
            .with_executable("/usr/local/bin/github-hosts")
    }

    #[test]
    fn shell_script_pins_settings_and_runs_update() {
        let script = RefreshScript::from_settings(&settings(Platform::Linux)).render();
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines[0], "#!/bin/sh");
        assert!(lines.contains(&"export GITHUB_HOSTS_FILE='/etc/hosts'"));
        assert!(lines.contains(&"export GITHUB_HOSTS_HOME='/opt/gh'"));
        assert_eq!(
            *lines.last().unwrap(),
            "'/usr/local/bin/github-hosts' update >> '/opt/gh/logs/update.log' 2>&1"
        );
        assert!(script.ends_with('\n'));
    }

    #[test]
    fn batch_script_uses_crlf() {
        let script = RefreshScript::from_settings(&settings(Platform::Windows)).render();
        assert!(script.starts_with("@echo off\r\n"));
        assert!(script.contains("set \"GITHUB_HOSTS_SOURCE_URL=https://github-hosts.tinsfox.com/hosts\""));
        assert!(script.contains(" update >> "));
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}

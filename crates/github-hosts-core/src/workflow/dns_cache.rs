//! OS DNS cache flush
//!
//! Run after every hosts-file change so resolvers pick up the new block
//! without waiting for cached answers to expire. The caller decides what a
//! failure means; the update workflow only logs it.

use crate::config::Platform;
use crate::error::{Error, Result};
use crate::scheduler::to_args;
use crate::traits::CommandRunner;

/// Flush commands for `platform`, tried in order until one succeeds
pub fn flush_commands(platform: Platform) -> Vec<(&'static str, Vec<String>)> {
    match platform {
        Platform::MacOs => vec![("killall", to_args(["-HUP", "mDNSResponder"]))],
        Platform::Linux => vec![
            ("resolvectl", to_args(["flush-caches"])),
            ("systemd-resolve", to_args(["--flush-caches"])),
            ("systemctl", to_args(["restart", "systemd-resolved"])),
        ],
        Platform::Windows => vec![("ipconfig", to_args(["/flushdns"]))],
    }
}

/// Flush the DNS cache
///
/// # Errors
///
/// `DnsFlush` with the last failure when every command failed.
pub async fn flush_dns_cache(platform: Platform, runner: &dyn CommandRunner) -> Result<()> {
    let mut last_failure = String::from("no flush command for platform");

    for (program, args) in flush_commands(platform) {
        match runner.run(program, &args).await {
            Ok(output) if output.success => {
                tracing::debug!(program, "Flushed DNS cache");
                return Ok(());
            }
            Ok(output) => last_failure = format!("{program}: {}", output.combined()),
            Err(e) => last_failure = e.to_string(),
        }
        tracing::debug!(program, failure = %last_failure, "DNS flush attempt failed");
    }

    Err(Error::DnsFlush(last_failure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_tries_resolvectl_first() {
        let commands = flush_commands(Platform::Linux);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].0, "resolvectl");
        assert_eq!(commands[2].1, vec!["restart", "systemd-resolved"]);
    }

    #[test]
    fn single_command_elsewhere() {
        assert_eq!(flush_commands(Platform::MacOs)[0].0, "killall");
        assert_eq!(flush_commands(Platform::Windows)[0].1, vec!["/flushdns"]);
    }
}

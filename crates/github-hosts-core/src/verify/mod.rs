// # Network Verifier
//
// Checks that the managed overrides actually take effect.
//
// For each entry in the managed block:
//
// 1. Resolve the hostname through the system resolver
// 2. Compare the first resolved address with the override address
// 3. GET https://<hostname>/ with keep-alive disabled
//
// Classification, first match wins:
//
// | Condition                    | Status           |
// |------------------------------|------------------|
// | resolution failed / timed out| `DnsFailure`     |
// | no HTTP response / timed out | `ConnectFailure` |
// | resolved address differs     | `IpMismatch`     |
// | status outside 2xx           | `BadStatus`      |
// | otherwise                    | `Ok`             |
//
// The probe targets the hostname, not the override address, so on a
// mismatch it reports whether the real upstream is reachable.
//
// Entries are evaluated concurrently up to a fixed limit, each inside its
// own deadline. Results come back in input order.

pub mod resolver;

pub use resolver::SystemResolver;

use futures::future::join_all;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};

use crate::config::VerifyConfig;
use crate::error::{Error, Result};
use crate::hosts::{HostsDocument, HostsEntry};
use crate::traits::{ProbeOutcome, Prober, Resolver};

/// Outcome class of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Resolved to the override address and answered 2xx
    Ok,
    /// Hostname did not resolve in time
    DnsFailure,
    /// No HTTP response in time
    ConnectFailure,
    /// Resolved to a different address than the override
    IpMismatch,
    /// Answered with a non-2xx status
    BadStatus,
}

impl VerificationStatus {
    /// `true` only for [`VerificationStatus::Ok`]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Ok => "OK",
            Self::DnsFailure => "DNS failure",
            Self::ConnectFailure => "connect failure",
            Self::IpMismatch => "IP mismatch",
            Self::BadStatus => "bad status",
        })
    }
}

/// Result for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Entry that was checked
    pub entry: HostsEntry,
    /// Classification
    pub status: VerificationStatus,
    /// First address the resolver returned
    pub observed_address: Option<IpAddr>,
    /// HTTP status, when a response arrived
    pub http_status: Option<u16>,
    /// Failure detail for logs and display
    pub detail: Option<String>,
    /// Time spent on this entry
    pub elapsed: Duration,
}

/// Aggregated results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// One result per input entry, in input order
    pub results: Vec<VerificationResult>,
    /// Entries with status `Ok`
    pub success_count: usize,
    /// All other entries
    pub fail_count: usize,
}

impl VerificationReport {
    fn from_results(results: Vec<VerificationResult>) -> Self {
        let success_count = results.iter().filter(|r| r.status.is_ok()).count();
        let fail_count = results.len() - success_count;
        Self {
            results,
            success_count,
            fail_count,
        }
    }
}

/// Resolver + prober with a per-entry deadline and bounded concurrency
pub struct NetworkVerifier {
    resolver: Arc<dyn Resolver>,
    prober: Arc<dyn Prober>,
    timeout: Duration,
    max_concurrency: usize,
}

impl NetworkVerifier {
    /// Create a verifier
    pub fn new(resolver: Arc<dyn Resolver>, prober: Arc<dyn Prober>, config: &VerifyConfig) -> Self {
        Self {
            resolver,
            prober,
            timeout: Duration::from_secs(config.timeout_secs),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Override the per-entry deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Entries to test: the managed block only.
    ///
    /// # Errors
    ///
    /// `NoEntries` if the block is absent or empty.
    pub fn plan(document: &HostsDocument) -> Result<Vec<HostsEntry>> {
        let entries = document.managed_entries();
        if entries.is_empty() {
            return Err(Error::NoEntries);
        }
        Ok(entries)
    }

    /// Check one entry
    pub async fn verify(&self, entry: &HostsEntry) -> VerificationResult {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let result = |status, observed_address, http_status, detail| VerificationResult {
            entry: entry.clone(),
            status,
            observed_address,
            http_status,
            detail,
            elapsed: started.elapsed(),
        };

        let addresses = match timeout_at(deadline, self.resolver.resolve(&entry.hostname)).await {
            Ok(Ok(addresses)) => addresses,
            Ok(Err(e)) => {
                return result(VerificationStatus::DnsFailure, None, None, Some(e.to_string()));
            }
            Err(_) => {
                return result(
                    VerificationStatus::DnsFailure,
                    None,
                    None,
                    Some(format!("resolution timed out after {:?}", self.timeout)),
                );
            }
        };
        let Some(observed) = addresses.first().copied() else {
            return result(
                VerificationStatus::DnsFailure,
                None,
                None,
                Some("resolver returned no addresses".to_string()),
            );
        };

        let code = match timeout_at(deadline, self.prober.probe(&entry.hostname)).await {
            Ok(ProbeOutcome::Status(code)) => code,
            Ok(ProbeOutcome::Transport(detail)) => {
                return result(VerificationStatus::ConnectFailure, Some(observed), None, Some(detail));
            }
            Err(_) => {
                return result(
                    VerificationStatus::ConnectFailure,
                    Some(observed),
                    None,
                    Some(format!("request timed out after {:?}", self.timeout)),
                );
            }
        };

        if observed != entry.address {
            return result(
                VerificationStatus::IpMismatch,
                Some(observed),
                Some(code),
                Some(format!("expected {}, resolved {observed}", entry.address)),
            );
        }
        if !(200..300).contains(&code) {
            return result(
                VerificationStatus::BadStatus,
                Some(observed),
                Some(code),
                Some(format!("HTTP {code}")),
            );
        }
        result(VerificationStatus::Ok, Some(observed), Some(code), None)
    }

    /// Check every entry, at most `max_concurrency` at a time
    pub async fn verify_all(&self, entries: &[HostsEntry]) -> VerificationReport {
        let semaphore = Semaphore::new(self.max_concurrency);

        let futures = entries.iter().map(|entry| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                let result = self.verify(entry).await;
                tracing::debug!(
                    host = %entry.hostname,
                    status = %result.status,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Verified entry"
                );
                result
            }
        });

        let report = VerificationReport::from_results(join_all(futures).await);
        tracing::info!(
            success = report.success_count,
            failed = report.fail_count,
            "Verification finished"
        );
        report
    }
}

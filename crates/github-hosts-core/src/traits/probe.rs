// # Resolver and Prober Traits
//
// The two network steps of verification. The verifier owns the timeouts;
// implementations may block as long as the network does.

use async_trait::async_trait;
use std::net::IpAddr;

/// Result of one HTTPS probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived with this status code
    Status(u16),
    /// No response (connect, TLS or read failure)
    Transport(String),
}

/// Name resolution through the system resolver
///
/// The system resolver honours the hosts file, which is what verification
/// is meant to observe.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname` to addresses in resolver order
    async fn resolve(&self, hostname: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// One secure-transport GET against a host
#[async_trait]
pub trait Prober: Send + Sync {
    /// GET `https://<hostname>/` and report the status or the failure
    async fn probe(&self, hostname: &str) -> ProbeOutcome;
}

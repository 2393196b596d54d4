//! Hosts-file line records

use std::fmt;
use std::net::IpAddr;

use crate::error::{Error, Result};

/// One override: map `hostname` to a fixed `address`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostsEntry {
    /// Override address
    pub address: IpAddr,
    /// Hostname, never empty and never containing whitespace
    pub hostname: String,
}

impl HostsEntry {
    /// Create an entry, validating both fields
    pub fn new(address: &str, hostname: impl Into<String>) -> Result<Self> {
        let address: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| Error::invalid_entry(format!("invalid address: {address}")))?;
        Self::from_parts(address, hostname)
    }

    /// Create an entry from an already parsed address
    pub fn from_parts(address: IpAddr, hostname: impl Into<String>) -> Result<Self> {
        let hostname = hostname.into();
        if hostname.is_empty() || hostname.chars().any(char::is_whitespace) {
            return Err(Error::invalid_entry(format!("invalid hostname: {hostname:?}")));
        }
        Ok(Self { address, hostname })
    }

    /// Parse one `address hostname [hostname...]` line.
    ///
    /// Returns `Ok(vec![])` for blank and comment lines. Trailing `#`
    /// comments are ignored. A line with several hostnames yields one entry
    /// per hostname.
    pub fn parse_line(line: &str) -> Result<Vec<Self>> {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let mut fields = content.split_whitespace();
        let address = fields.next().unwrap_or_default();
        let hostnames: Vec<&str> = fields.collect();
        if hostnames.is_empty() {
            return Err(Error::invalid_entry(format!("missing hostname: {line:?}")));
        }

        hostnames
            .into_iter()
            .map(|hostname| Self::new(address, hostname))
            .collect()
    }
}

impl fmt::Display for HostsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.hostname)
    }
}

/// Parse a fetched override document.
///
/// Invalid lines are skipped with a warning; the rest of the document is
/// still used.
pub fn parse_entries(text: &str) -> Vec<HostsEntry> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match HostsEntry::parse_line(line) {
            Ok(parsed) => entries.extend(parsed),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping unparseable hosts line");
            }
        }
    }
    entries
}

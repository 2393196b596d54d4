// # HTTP Implementations
//
// HTTPS implementations of the github-hosts core traits.
//
// - `HttpHostsSource`: downloads the published override document
//   (`address hostname` lines) and parses it into entries
// - `HttpProber`: the verifier's reachability check, one GET per host with
//   connection reuse disabled so every probe opens a fresh connection
//   through the current resolution

use github_hosts_core::hosts::{HostsEntry, parse_entries};
use github_hosts_core::traits::{HostsSource, ProbeOutcome, Prober};
use github_hosts_core::{Error, Result};

use std::time::Duration;

/// Default timeout for fetching the override document
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

fn user_agent() -> String {
    format!("github-hosts/{}", env!("CARGO_PKG_VERSION"))
}

/// Fetches override entries over HTTP(S)
pub struct HttpHostsSource {
    /// Document URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpHostsSource {
    /// Create a source for `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Create a source with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| Error::fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(url, client))
    }

    /// Create a source using a preconfigured client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl HostsSource for HttpHostsSource {
    async fn fetch(&self) -> Result<Vec<HostsEntry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("Request failed: {e}")))?;

        // Anything but 200 is a hard failure; never install a partial list
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::fetch(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("Failed to read response: {e}")))?;

        let entries = parse_entries(&body);
        if entries.is_empty() {
            return Err(Error::fetch(format!("no host entries in {}", self.url)));
        }

        tracing::debug!(url = %self.url, entries = entries.len(), "Fetched hosts entries");
        Ok(entries)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// GET prober with keep-alive disabled
pub struct HttpProber {
    /// URL scheme, `https` outside tests
    scheme: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpProber {
    /// Create a prober whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .user_agent(user_agent())
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            scheme: "https".to_string(),
            client,
        })
    }

    /// Probe with a different scheme (plain `http` against local servers)
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    fn url_for(&self, hostname: &str) -> String {
        format!("{}://{hostname}/", self.scheme)
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, hostname: &str) -> ProbeOutcome {
        let url = self.url_for(hostname);
        match self
            .client
            .get(&url)
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .await
        {
            Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Probe failed");
                ProbeOutcome::Transport(e.to_string())
            }
        }
    }
}

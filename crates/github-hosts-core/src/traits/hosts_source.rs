// # Hosts Source Trait
//
// Supplies the list of override entries that goes into the managed block.
//
// ## Implementations
//
// - HTTP: `github-hosts-http::HttpHostsSource` fetches the published document
// - Tests: static lists and failing sources

use async_trait::async_trait;

use crate::hosts::HostsEntry;

/// Source of override entries
///
/// A fetch either yields a complete, non-empty entry list or fails. A failed
/// fetch must never be turned into an empty list, because installing an
/// empty block would silently drop every override.
#[async_trait]
pub trait HostsSource: Send + Sync {
    /// Fetch the current entries
    ///
    /// # Returns
    ///
    /// - `Ok(entries)`: At least one entry
    /// - `Err(Error::Fetch)`: Transport failure, bad status or empty document
    async fn fetch(&self) -> Result<Vec<HostsEntry>, crate::Error>;

    /// Where the entries come from, for logs
    fn describe(&self) -> String;
}

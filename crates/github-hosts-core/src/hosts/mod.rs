//! Hosts file model, managed block editing and atomic commit
//!
//! - [`HostsEntry`]: one `address hostname` override
//! - [`ManagedBlock`]: the marker-delimited region owned by this tool
//! - [`HostsDocument`]: the whole file split around the block
//! - [`commit`]: temp-then-rename replacement of a file

pub mod block;
pub mod commit;
pub mod document;
pub mod entry;

pub use block::{END_MARKER, ManagedBlock, START_MARKER, render_managed_block};
pub use commit::commit;
pub use document::{HostsDocument, LineEnding};
pub use entry::{HostsEntry, parse_entries};

use crate::error::Result;

/// Parse only the managed block out of `content`.
///
/// `Ok(None)` when the file has no block.
pub fn parse_managed_block(content: impl AsRef<[u8]>) -> Result<Option<ManagedBlock>> {
    Ok(HostsDocument::parse(content)?.block)
}

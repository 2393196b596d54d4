//! Managed block markers and rendering
//!
//! The block is delimited by two literal comment lines. Detection is plain
//! string comparison on the trimmed line; there is no grammar beyond that.
//!
//! ```text
//! # ===== GitHub Hosts Start =====
//! # (Updated: 2025-01-09 12:00:00 UTC)
//! 140.82.112.4 github.com
//! # ===== GitHub Hosts End =====
//! ```

use chrono::{DateTime, Utc};

use super::entry::HostsEntry;
use crate::error::{Error, Result};

/// Opening marker line
pub const START_MARKER: &str = "# ===== GitHub Hosts Start =====";

/// Closing marker line
pub const END_MARKER: &str = "# ===== GitHub Hosts End =====";

const UPDATED_PREFIX: &str = "# (Updated: ";

/// Contents of the managed block, markers excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    /// Timestamp comment text, if one was present
    pub updated: Option<String>,
    /// Non-comment, non-blank lines in file order
    pub lines: Vec<String>,
}

impl ManagedBlock {
    /// Build a block from entries
    pub fn from_entries(entries: &[HostsEntry], timestamp: DateTime<Utc>) -> Self {
        Self {
            updated: Some(format_timestamp(timestamp)),
            lines: entries.iter().map(ToString::to_string).collect(),
        }
    }

    /// Parse block lines into entries. Lines that do not parse are skipped.
    pub fn entries(&self) -> Vec<HostsEntry> {
        self.lines
            .iter()
            .filter_map(|line| HostsEntry::parse_line(line).ok())
            .flatten()
            .collect()
    }

    /// Serialize the block including both markers
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len() + 3);
        out.push(START_MARKER.to_string());
        if let Some(updated) = &self.updated {
            out.push(format!("{UPDATED_PREFIX}{updated})"));
        }
        out.extend(self.lines.iter().cloned());
        out.push(END_MARKER.to_string());
        out
    }
}

/// Render `entries` as a complete block stamped with `timestamp`
pub fn render_managed_block(entries: &[HostsEntry], timestamp: DateTime<Utc>) -> Vec<String> {
    ManagedBlock::from_entries(entries, timestamp).render()
}

/// Location of a managed block inside a list of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockSpan {
    /// Index of the start marker
    pub start: usize,
    /// Index of the end marker
    pub end: usize,
}

/// Find the block markers in `lines`.
///
/// Returns `Ok(None)` when neither marker is present and
/// [`Error::MalformedBlock`] when only one is, when either appears more than
/// once, or when the end marker precedes the start marker.
pub(crate) fn locate<S: AsRef<[u8]>>(lines: &[S]) -> Result<Option<BlockSpan>> {
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref().trim_ascii();
        if line == START_MARKER.as_bytes() {
            starts.push(index);
        } else if line == END_MARKER.as_bytes() {
            ends.push(index);
        }
    }

    match (starts.as_slice(), ends.as_slice()) {
        ([], []) => Ok(None),
        ([start], [end]) if start < end => Ok(Some(BlockSpan {
            start: *start,
            end: *end,
        })),
        ([_], [_]) => Err(Error::malformed("end marker precedes start marker")),
        ([_], []) => Err(Error::malformed("start marker without end marker")),
        ([], [_]) => Err(Error::malformed("end marker without start marker")),
        _ => Err(Error::malformed(format!(
            "duplicate markers ({} start, {} end)",
            starts.len(),
            ends.len()
        ))),
    }
}

/// Build a [`ManagedBlock`] from the lines strictly between the markers.
///
/// The block is written by this tool and is always UTF-8; lines that are
/// not are skipped like comments.
pub(crate) fn collect<S: AsRef<[u8]>>(inner: &[S]) -> ManagedBlock {
    let mut updated = None;
    let mut lines = Vec::new();
    for line in inner {
        let Ok(line) = std::str::from_utf8(line.as_ref()) else {
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(UPDATED_PREFIX) {
            if updated.is_none() {
                updated = Some(rest.trim_end_matches(')').to_string());
            }
            continue;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed.to_string());
    }
    ManagedBlock { updated, lines }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

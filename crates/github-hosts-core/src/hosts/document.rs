//! Whole-file model and the managed block editor
//!
//! A [`HostsDocument`] splits the hosts file into the lines before the
//! managed block, the block itself, and the lines after it. Editing only
//! ever replaces the middle part; `prefix` and `suffix` are carried through
//! byte for byte apart from blank-line normalization:
//!
//! - runs of blank lines collapse to a single blank line
//! - exactly one blank line separates `prefix` from the block
//! - the output ends with exactly one newline
//!
//! Lines outside the block are never decoded. Hosts files shared with other
//! tools may carry comments in a legacy code page, and those bytes must
//! survive every edit unchanged.

use chrono::{DateTime, Utc};

use super::block::{self, ManagedBlock};
use super::entry::HostsEntry;
use crate::error::Result;

/// Line terminator used when serializing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n` (Windows hosts files)
    CrLf,
}

impl LineEnding {
    fn detect(content: &[u8]) -> Self {
        if content.windows(2).any(|pair| pair == b"\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

/// Parsed hosts file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostsDocument {
    /// Raw lines before the managed block (the whole file when there is none)
    pub prefix: Vec<Vec<u8>>,
    /// The managed block, if present
    pub block: Option<ManagedBlock>,
    /// Raw lines after the managed block
    pub suffix: Vec<Vec<u8>>,
    /// Terminator detected on parse
    pub line_ending: LineEnding,
}

impl HostsDocument {
    /// Parse file content. Any encoding is accepted outside the block.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedBlock`](crate::Error::MalformedBlock) if the markers
    /// are unpaired, duplicated or out of order.
    pub fn parse(content: impl AsRef<[u8]>) -> Result<Self> {
        let content = content.as_ref();
        let line_ending = LineEnding::detect(content);
        let lines = split_lines(content);

        let Some(span) = block::locate(&lines)? else {
            return Ok(Self {
                prefix: lines,
                block: None,
                suffix: Vec::new(),
                line_ending,
            });
        };

        Ok(Self {
            prefix: lines[..span.start].to_vec(),
            block: Some(block::collect(&lines[span.start + 1..span.end])),
            suffix: lines[span.end + 1..].to_vec(),
            line_ending,
        })
    }

    /// Whether the document currently contains a managed block
    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Entries inside the managed block (empty if there is none)
    pub fn managed_entries(&self) -> Vec<HostsEntry> {
        self.block
            .as_ref()
            .map(ManagedBlock::entries)
            .unwrap_or_default()
    }

    /// Insert or replace the managed block.
    ///
    /// Without an existing block the new one is appended at end of file
    /// after a single blank line. With one, it is replaced in place.
    pub fn install(&self, entries: &[HostsEntry], timestamp: DateTime<Utc>) -> Self {
        Self {
            prefix: self.prefix.clone(),
            block: Some(ManagedBlock::from_entries(entries, timestamp)),
            suffix: self.suffix.clone(),
            line_ending: self.line_ending,
        }
    }

    /// Strip the managed block and the blank separator before it
    pub fn remove(&self) -> Self {
        let mut prefix = self.prefix.clone();
        if self.block.is_some() {
            trim_trailing_blank(&mut prefix);
        }
        prefix.extend(self.suffix.iter().cloned());

        Self {
            prefix,
            block: None,
            suffix: Vec::new(),
            line_ending: self.line_ending,
        }
    }

    /// Serialize to file content
    pub fn render(&self) -> Vec<u8> {
        let mut out = collapse_blank_runs(&self.prefix);

        if let Some(block) = &self.block {
            trim_trailing_blank(&mut out);
            if !out.is_empty() {
                out.push(Vec::new());
            }
            out.extend(block.render().into_iter().map(String::into_bytes));

            let suffix = collapse_blank_runs(&self.suffix);
            if suffix.iter().any(|line| !is_blank(line)) {
                out.extend(suffix);
            }
        }

        trim_trailing_blank(&mut out);
        if out.is_empty() {
            return Vec::new();
        }

        let newline = self.line_ending.as_bytes();
        let mut content = out.join(newline);
        content.extend_from_slice(newline);
        content
    }
}

/// Split on `\n`, dropping one trailing `\r` per line and the empty piece
/// after a final newline
fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    if content.is_empty() {
        return Vec::new();
    }
    let content = content.strip_suffix(b"\n").unwrap_or(content);
    content
        .split(|&byte| byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect()
}

fn is_blank(line: &[u8]) -> bool {
    line.trim_ascii().is_empty()
}

fn collapse_blank_runs(lines: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(lines.len());
    let mut previous_blank = false;
    for line in lines {
        if is_blank(line) {
            if !previous_blank {
                out.push(Vec::new());
            }
            previous_blank = true;
        } else {
            out.push(line.clone());
            previous_blank = false;
        }
    }
    out
}

fn trim_trailing_blank(lines: &mut Vec<Vec<u8>>) {
    while lines.last().is_some_and(|line| is_blank(line)) {
        lines.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::block::{END_MARKER, START_MARKER};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap()
    }

    fn entries() -> Vec<HostsEntry> {
        vec![HostsEntry::new("2.2.2.2", "b.com").unwrap()]
    }

    fn text(doc: &HostsDocument) -> String {
        String::from_utf8(doc.render()).unwrap()
    }

    #[test]
    fn parse_without_block_keeps_everything_in_prefix() {
        let doc = HostsDocument::parse("127.0.0.1 localhost\n::1 localhost\n").unwrap();
        assert!(!doc.has_block());
        assert_eq!(doc.prefix.len(), 2);
        assert!(doc.suffix.is_empty());
    }

    #[test]
    fn parse_splits_around_block() {
        let content = format!("a\n\n{START_MARKER}\n1.1.1.1 x.com\n{END_MARKER}\nb\n");
        let doc = HostsDocument::parse(&content).unwrap();
        assert_eq!(doc.prefix, vec![b"a".to_vec(), Vec::new()]);
        assert_eq!(doc.suffix, vec![b"b".to_vec()]);
        assert_eq!(doc.managed_entries().len(), 1);
    }

    #[test]
    fn install_replaces_in_place() {
        let content = format!("a\n\n{START_MARKER}\n1.1.1.1 x.com\n{END_MARKER}\nb\n");
        let doc = HostsDocument::parse(&content).unwrap();
        let out = text(&doc.install(&entries(), ts()));
        assert_eq!(
            out,
            format!(
                "a\n\n{START_MARKER}\n# (Updated: 2025-01-09 12:00:00 UTC)\n2.2.2.2 b.com\n{END_MARKER}\nb\n"
            )
        );
    }

    #[test]
    fn install_into_empty_file_has_no_leading_blank() {
        let doc = HostsDocument::parse("").unwrap();
        let out = text(&doc.install(&entries(), ts()));
        assert!(out.starts_with(START_MARKER));
    }

    #[test]
    fn remove_without_block_is_noop_on_normalized_content() {
        let content = "a\nb\n";
        let doc = HostsDocument::parse(content).unwrap();
        assert_eq!(text(&doc.remove()), content);
    }

    #[test]
    fn crlf_is_preserved() {
        let doc = HostsDocument::parse("127.0.0.1 localhost\r\n").unwrap();
        let out = text(&doc.install(&entries(), ts()));
        assert!(out.starts_with("127.0.0.1 localhost\r\n\r\n"));
        assert!(out.ends_with(&format!("{END_MARKER}\r\n")));
        assert_eq!(text(&doc.remove()), "127.0.0.1 localhost\r\n");
    }

    #[test]
    fn malformed_block_is_reported() {
        let content = format!("a\n{START_MARKER}\n1.1.1.1 x.com\n");
        assert!(HostsDocument::parse(&content).is_err());
    }

    #[test]
    fn lines_outside_block_are_kept_byte_for_byte() {
        let mut content = b"127.0.0.1 localhost\n# \xc4\xe3\xba\xc3\n".to_vec();
        let doc = HostsDocument::parse(&content).unwrap();

        let installed = doc.install(&entries(), ts()).render();
        assert!(installed.starts_with(&content));

        let removed = HostsDocument::parse(&installed).unwrap().remove().render();
        assert_eq!(removed, content);

        // Invalid bytes inside the block are dropped with the other comments
        content.extend_from_slice(format!("{START_MARKER}\n").as_bytes());
        content.extend_from_slice(b"# \xff\n\xfe\xfe\n2.2.2.2 b.com\n");
        content.extend_from_slice(format!("{END_MARKER}\n").as_bytes());
        let doc = HostsDocument::parse(&content).unwrap();
        assert_eq!(doc.managed_entries(), entries());
    }
}

//! Line-oriented diff between two document snapshots.
//!
//! Produces the same hunks a normal `diff old new` would: every region where
//! the line sequences disagree, with runs of identical lines elided. The
//! comparison is over raw byte lines (newline included), so a missing
//! trailing newline is a real difference and non-UTF-8 input is compared
//! uninterpreted.

use crate::lines::split_lines;
use serde::Serialize;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::fmt;
use std::ops::Range;

/// Inclusive, 1-based span of whole lines.
///
/// A span with `end < start` is empty and denotes the insertion point
/// immediately before line `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty span positioned before `line`.
    pub fn before(line: usize) -> Self {
        Self {
            start: line,
            end: line.saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Convert a 0-based half-open index range into a 1-based span.
    fn from_indices(range: Range<usize>) -> Self {
        if range.is_empty() {
            Self::before(range.start + 1)
        } else {
            Self::new(range.start + 1, range.end)
        }
    }

    /// Render in normal-diff notation: `3`, `3,5`, or the preceding line
    /// number for an empty span.
    fn fmt_address(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "{}", self.start.saturating_sub(1))
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{},{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Delete,
    Change,
}

impl ChangeKind {
    fn letter(self) -> char {
        match self {
            ChangeKind::Insert => 'a',
            ChangeKind::Delete => 'd',
            ChangeKind::Change => 'c',
        }
    }
}

/// One contiguous region where old and new disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub old: LineSpan,
    pub new: LineSpan,
    pub kind: ChangeKind,
}

impl ChangeRecord {
    /// Build a record, deriving its kind from which spans are empty.
    ///
    /// Two empty spans describe no change at all and are classified as a
    /// `Change` that replaces nothing with nothing.
    pub fn new(old: LineSpan, new: LineSpan) -> Self {
        let kind = match (old.is_empty(), new.is_empty()) {
            (true, false) => ChangeKind::Insert,
            (false, true) => ChangeKind::Delete,
            _ => ChangeKind::Change,
        };
        Self { old, new, kind }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.old.fmt_address(f)?;
        write!(f, "{}", self.kind.letter())?;
        self.new.fmt_address(f)
    }
}

/// Diff two snapshots line by line.
///
/// Records come back in ascending old-line order and never overlap or touch:
/// at least one common line separates consecutive records.
pub fn diff_lines(old: &[u8], new: &[u8]) -> Vec<ChangeRecord> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    diff_line_slices(&old_lines, &new_lines)
}

/// Diff two pre-split line sequences.
pub fn diff_line_slices(old_lines: &[&[u8]], new_lines: &[&[u8]]) -> Vec<ChangeRecord> {
    let ops = capture_diff_slices(Algorithm::Myers, old_lines, new_lines);

    let mut records = Vec::new();
    // Start of the hunk being accumulated, as (old, new) line indices.
    let mut pending: Option<(usize, usize)> = None;
    let mut old_pos = 0;
    let mut new_pos = 0;

    // Positions come from running cursors: the anchor index similar reports
    // for an insert or delete is not always past the preceding equal run.
    for op in &ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            if let Some((old_start, new_start)) = pending.take() {
                records.push(to_record(old_start..old_pos, new_start..new_pos));
            }
        } else if pending.is_none() {
            pending = Some((old_pos, new_pos));
        }
        old_pos += old_range.len();
        new_pos += new_range.len();
    }
    if let Some((old_start, new_start)) = pending {
        records.push(to_record(old_start..old_pos, new_start..new_pos));
    }

    records
}

fn to_record(old_range: Range<usize>, new_range: Range<usize>) -> ChangeRecord {
    ChangeRecord::new(
        LineSpan::from_indices(old_range),
        LineSpan::from_indices(new_range),
    )
}

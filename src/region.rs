//! Top-of-file resynchronisation.
//!
//! Instead of diffing the whole document, compare only its leading region
//! (typically the import block) and replace that region wholesale when it
//! changed. Nothing after the region's end in the old snapshot is ever
//! addressed.

use crate::diff::{ChangeKind, LineSpan};
use crate::lines::{count_lines, split_lines};
use crate::plan::{EditOperation, EditPlan};
use serde::Deserialize;

/// Rule locating the end of the leading region of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RegionRule {
    /// Up to and including the first empty line.
    FirstBlankLine,
    /// Up to and including the first line starting with `prefix`.
    Sentinel { prefix: String },
    /// Package clause, imports and includes, with interleaved blank and
    /// comment lines.
    #[default]
    ImportBlock,
}

impl RegionRule {
    /// Byte length of the leading region of `buffer`.
    ///
    /// When a blank-line or sentinel delimiter never appears the region is
    /// the whole buffer. A buffer without header lines has an empty import
    /// block.
    pub fn region_end(&self, buffer: &[u8]) -> usize {
        match self {
            RegionRule::FirstBlankLine => {
                end_after_line(buffer, |line| trim_newline(line).is_empty())
            }
            RegionRule::Sentinel { prefix } => {
                end_after_line(buffer, |line| line.starts_with(prefix.as_bytes()))
            }
            RegionRule::ImportBlock => import_block_end(buffer),
        }
    }

    /// The leading region of `buffer`.
    pub fn extract<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[..self.region_end(buffer)]
    }
}

fn end_after_line(buffer: &[u8], is_delimiter: impl Fn(&[u8]) -> bool) -> usize {
    let mut offset = 0;
    for line in split_lines(buffer) {
        offset += line.len();
        if is_delimiter(line) {
            return offset;
        }
    }
    buffer.len()
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |idx| idx + 1);
    &line[start..end]
}

const HEADER_PREFIXES: &[&[u8]] = &[
    b"package ",
    b"import ",
    b"import\"",
    b"#include",
    b"#import",
    b"#pragma once",
];

/// End of the last header line in the leading run of header, blank and
/// comment lines. Blank lines and comments that trail the header are left
/// outside the region.
///
/// An include guard (`#ifndef X` directly followed by `#define X`) counts as
/// header only before the first include or import.
fn import_block_end(buffer: &[u8]) -> usize {
    let mut offset = 0;
    let mut end = 0;
    let mut in_group = false;
    let mut in_comment = false;
    let mut guard_allowed = true;
    let mut guard_define = false;

    for line in split_lines(buffer) {
        offset += line.len();
        let text = trim_ascii(line);

        if in_comment {
            if text.windows(2).any(|w| w == b"*/") {
                in_comment = false;
            }
            continue;
        }
        if in_group {
            end = offset;
            if text.starts_with(b")") {
                in_group = false;
            }
            continue;
        }
        if text.is_empty() || text.starts_with(b"//") {
            continue;
        }
        if guard_define {
            guard_define = false;
            if text.starts_with(b"#define ") {
                end = offset;
                continue;
            }
        }
        if guard_allowed && text.starts_with(b"#ifndef ") {
            guard_allowed = false;
            guard_define = true;
            end = offset;
            continue;
        }
        if text.starts_with(b"/*") {
            in_comment = !text[2..].windows(2).any(|w| w == b"*/");
            continue;
        }
        if text.starts_with(b"import (") || text.starts_with(b"import(") {
            guard_allowed = false;
            end = offset;
            in_group = !text.ends_with(b")");
            continue;
        }
        if HEADER_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
            guard_allowed = false;
            end = offset;
            continue;
        }
        break;
    }

    end
}

/// Plan a single replacement of the leading region, or nothing when the
/// regions already agree.
pub fn plan_region(rule: &RegionRule, old: &[u8], new: &[u8]) -> EditPlan {
    let old_top = rule.extract(old);
    let new_top = rule.extract(new);

    if old_top == new_top {
        tracing::debug!("leading region unchanged");
        return EditPlan::default();
    }

    let line_count = count_lines(old_top);
    let lines = if line_count == 0 {
        LineSpan::before(1)
    } else {
        LineSpan::new(1, line_count)
    };
    let kind = match (old_top.is_empty(), new_top.is_empty()) {
        (true, _) => ChangeKind::Insert,
        (false, true) => ChangeKind::Delete,
        (false, false) => ChangeKind::Change,
    };

    tracing::debug!(
        old_len = old_top.len(),
        new_len = new_top.len(),
        "leading region differs"
    );

    EditPlan::from_operations(vec![EditOperation {
        kind,
        lines,
        byte_start: 0,
        byte_end: old_top.len(),
        replacement: new_top.to_vec(),
    }])
}

//! Turn change records into range-replacement operations.
//!
//! Every operation is addressed in the coordinates of the *original*
//! document. Operations are ordered from the end of the document toward the
//! start, so applying them in order never disturbs the address of an
//! operation that has not been applied yet.

use crate::diff::{diff_lines, ChangeKind, ChangeRecord, LineSpan};
use crate::lines::{extract_lines, line_range};
use serde::Serialize;
use std::ops::Range;

/// Replace `[byte_start, byte_end)` (equivalently, old lines `lines`) of the
/// live document with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "EditOperation does nothing until handed to a DocumentSink"]
pub struct EditOperation {
    pub kind: ChangeKind,
    /// Old-document lines being replaced; empty for an insertion point
    pub lines: LineSpan,
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    #[serde(serialize_with = "serialize_lossy")]
    pub replacement: Vec<u8>,
}

impl EditOperation {
    pub fn byte_range(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }

    pub fn is_insertion(&self) -> bool {
        self.byte_start == self.byte_end
    }
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Ordered operations for one document, last change first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditPlan {
    operations: Vec<EditOperation>,
    skipped: usize,
}

impl EditPlan {
    pub(crate) fn from_operations(operations: Vec<EditOperation>) -> Self {
        Self {
            operations,
            skipped: 0,
        }
    }

    /// Operations in application order (descending start address).
    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True when applying the plan would leave the document untouched.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of anomalous change records that were dropped while planning.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Apply the plan to an in-memory copy of the snapshot it was computed
    /// against.
    ///
    /// Returns `None` if an operation falls outside the buffer, which only
    /// happens when the plan is applied to the wrong snapshot.
    pub fn apply_to(&self, original: &[u8]) -> Option<Vec<u8>> {
        let mut content = original.to_vec();
        for op in &self.operations {
            if op.byte_start > op.byte_end || op.byte_end > content.len() {
                return None;
            }
            content.splice(op.byte_range(), op.replacement.iter().copied());
        }
        Some(content)
    }
}

/// Plan the edits that turn `old` into `new` given their change records.
///
/// `changes` must be in ascending old-line order, as produced by
/// [`diff_lines`]. A record whose old or new span starts at line 0 cannot be
/// addressed; it is logged and skipped while the rest of the plan proceeds.
pub fn plan_edits(changes: &[ChangeRecord], old: &[u8], new: &[u8]) -> EditPlan {
    let mut operations = Vec::with_capacity(changes.len());
    let mut skipped = 0;

    for change in changes.iter().rev() {
        if change.old.start == 0 || change.new.start == 0 {
            // TODO: decide whether an unaddressable hunk should fail the whole
            // plan instead of being dropped.
            tracing::warn!(hunk = %change, "skipping change record with unaddressable span");
            skipped += 1;
            continue;
        }

        let target = match change.kind {
            ChangeKind::Insert => line_range(old, change.old.start, change.old.start - 1),
            ChangeKind::Delete | ChangeKind::Change => {
                line_range(old, change.old.start, change.old.end)
            }
        };
        let replacement = match change.kind {
            ChangeKind::Delete => Vec::new(),
            ChangeKind::Insert | ChangeKind::Change => {
                extract_lines(new, change.new.start, change.new.end).to_vec()
            }
        };

        tracing::debug!(
            hunk = %change,
            byte_start = target.start,
            byte_end = target.end,
            replacement_len = replacement.len(),
            "planned edit"
        );

        operations.push(EditOperation {
            kind: change.kind,
            lines: change.old,
            byte_start: target.start,
            byte_end: target.end,
            replacement,
        });
    }

    EditPlan {
        operations,
        skipped,
    }
}

/// Diff `old` against `new` and plan the edits for the whole document.
pub fn plan_whole_file(old: &[u8], new: &[u8]) -> EditPlan {
    if old == new {
        return EditPlan::default();
    }
    let changes = diff_lines(old, new);
    plan_edits(&changes, old, new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_replaces_line() {
        let old = b"a\nb\nc\n";
        let new = b"a\nx\nc\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.len(), 1);
        let op = &plan.operations()[0];
        assert_eq!(op.kind, ChangeKind::Change);
        assert_eq!(op.lines, LineSpan::new(2, 2));
        assert_eq!(op.byte_range(), 2..4);
        assert_eq!(op.replacement, b"x\n");
        assert_eq!(plan.apply_to(old).unwrap(), new);
    }

    #[test]
    fn test_insert_after_last_line() {
        let old = b"a\nb\n";
        let new = b"a\nb\nc\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.len(), 1);
        let op = &plan.operations()[0];
        assert_eq!(op.kind, ChangeKind::Insert);
        assert!(op.is_insertion());
        assert_eq!(op.byte_start, old.len());
        assert_eq!(op.replacement, b"c\n");
        assert_eq!(plan.apply_to(old).unwrap(), new);
    }

    #[test]
    fn test_delete_removes_full_line() {
        let old = b"a\nb\nc\n";
        let new = b"a\nc\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.len(), 1);
        let op = &plan.operations()[0];
        assert_eq!(op.kind, ChangeKind::Delete);
        assert_eq!(op.byte_range(), 2..4);
        assert!(op.replacement.is_empty());
        assert_eq!(plan.apply_to(old).unwrap(), new);
    }

    #[test]
    fn test_identical_is_noop() {
        let plan = plan_whole_file(b"same\n", b"same\n");
        assert!(plan.is_empty());
        assert_eq!(plan.skipped(), 0);
        assert_eq!(plan.apply_to(b"same\n").unwrap(), b"same\n");
    }

    #[test]
    fn test_operations_descend() {
        let old = b"1\n2\n3\n4\n5\n6\n";
        let new = b"0\n1\n2\nthree\n4\n6\nseven\n";
        let plan = plan_whole_file(old, new);
        assert!(plan.len() >= 3);
        for pair in plan.operations().windows(2) {
            assert!(pair[0].byte_start > pair[1].byte_start);
            assert!(pair[1].byte_end <= pair[0].byte_start);
        }
        assert_eq!(plan.apply_to(old).unwrap(), new);
    }

    #[test]
    fn test_ascending_application_corrupts() {
        let old = b"1\n2\n3\n4\n5\n";
        let new = b"1\n2a\n2b\n3\n4\nX\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.apply_to(old).unwrap(), new);

        // Same operations, wrong order: the first splice shifts every byte
        // after line 2, so the second operation lands on the wrong text.
        let ascending = plan.operations().iter().rev().cloned().collect();
        let ascending = EditPlan::from_operations(ascending);
        let corrupted = ascending.apply_to(old).unwrap();
        assert_ne!(corrupted, new);
        assert_eq!(corrupted, b"1\n2a\n2b\nX\n4\n5\n");
    }

    #[test]
    fn test_insert_after_kept_line() {
        let old = b"ab\n\n";
        let new = b"\n\nb\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.len(), 2);
        let insert = &plan.operations()[0];
        assert_eq!(insert.kind, ChangeKind::Insert);
        assert_eq!(insert.byte_range(), old.len()..old.len());
        assert_eq!(insert.replacement, b"\nb\n");
        assert_eq!(plan.apply_to(old).unwrap(), new);
    }

    #[test]
    fn test_reordered_lines_round_trip() {
        let pairs: &[(&str, &str)] = &[
            ("b\nc\na\nb\na", "a\nb\nc\na\nb\n"),
            ("b\nc\na\nb\na", "c\nb\na\n\nb"),
            (
                "package main\n\nimport \"os\"\n",
                "\n\npackage main\nimport \"os\"\n",
            ),
            ("}\n\nimport x\n}\n", "\n}\nimport x\n\n}\n\n"),
        ];
        for (old, new) in pairs {
            let (old, new) = (old.as_bytes(), new.as_bytes());
            let plan = plan_whole_file(old, new);
            for pair in plan.operations().windows(2) {
                assert!(pair[1].byte_end <= pair[0].byte_start);
                assert!(pair[1].byte_start < pair[0].byte_start);
            }
            assert_eq!(
                plan.apply_to(old).unwrap(),
                new,
                "{:?} -> {:?}",
                String::from_utf8_lossy(old),
                String::from_utf8_lossy(new)
            );
        }
    }

    #[test]
    fn test_unaddressable_record_is_skipped() {
        let old = b"a\nb\nc\n";
        let new = b"a\nB\nc\nd\n";
        let changes = vec![
            ChangeRecord::new(LineSpan::new(2, 2), LineSpan::new(2, 2)),
            ChangeRecord::new(LineSpan::new(0, 0), LineSpan::new(4, 4)),
        ];
        let plan = plan_edits(&changes, old, new);
        assert_eq!(plan.skipped(), 1);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.apply_to(old).unwrap(), b"a\nB\nc\n");
    }

    #[test]
    fn test_apply_to_rejects_out_of_range() {
        let plan = plan_whole_file(b"a\nb\nc\n", b"a\nc\n");
        assert!(plan.apply_to(b"a\n").is_none());
    }

    #[test]
    fn test_missing_trailing_newline_round_trip() {
        let old = b"fn main() {}";
        let new = b"fn main() {}\n";
        let plan = plan_whole_file(old, new);
        assert_eq!(plan.apply_to(old).unwrap(), new);

        let plan = plan_whole_file(new, old);
        assert_eq!(plan.apply_to(new).unwrap(), old);
    }
}

//! Guarded, ordered application of an [`EditPlan`].
//!
//! Before the first operation is applied the live document is compared with
//! the snapshot the plan was computed against. Any difference abandons the
//! whole plan: nothing is applied, nothing is merged, nothing is retried.

use crate::document::{DocumentError, DocumentSink, DocumentSource};
use crate::plan::EditPlan;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(
        "document modified since snapshot (snapshot {expected:016x}, {expected_len} bytes; \
         live {found:016x}, {found_len} bytes)"
    )]
    Stale {
        expected: u64,
        expected_len: usize,
        found: u64,
        found_len: usize,
    },

    #[error("cannot read live document: {0}")]
    Live(#[source] DocumentError),

    #[error("edit {index} of {total} failed: {source}")]
    Sink {
        index: usize,
        total: usize,
        #[source]
        source: DocumentError,
    },

    #[error("cannot persist edits: {0}")]
    Flush(#[source] DocumentError),
}

/// Outcome of a successfully applied plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Fail with [`ApplyError::Stale`] unless `live` is byte-identical to
/// `snapshot`.
pub fn ensure_fresh(snapshot: &[u8], live: &[u8]) -> Result<(), ApplyError> {
    if snapshot == live {
        return Ok(());
    }
    Err(ApplyError::Stale {
        expected: xxh3_64(snapshot),
        expected_len: snapshot.len(),
        found: xxh3_64(live),
        found_len: live.len(),
    })
}

/// Apply `plan` to `doc`, in plan order, after checking that the live
/// document still matches `snapshot`.
///
/// A sink failure stops the remaining operations and nothing is flushed.
pub fn apply_plan<D>(
    plan: &EditPlan,
    snapshot: &[u8],
    doc: &mut D,
) -> Result<ApplyReport, ApplyError>
where
    D: DocumentSource + DocumentSink + ?Sized,
{
    if plan.is_empty() {
        return Ok(ApplyReport {
            applied: 0,
            skipped: plan.skipped(),
        });
    }

    let live = doc.read_live().map_err(ApplyError::Live)?;
    if let Err(err) = ensure_fresh(snapshot, &live) {
        tracing::warn!(error = %err, "abandoning edit plan");
        return Err(err);
    }

    let total = plan.len();
    for (index, op) in plan.operations().iter().enumerate() {
        doc.apply_edit(op).map_err(|source| {
            tracing::warn!(
                index = index + 1,
                total,
                error = %source,
                "edit failed, aborting remaining edits"
            );
            ApplyError::Sink {
                index: index + 1,
                total,
                source,
            }
        })?;
    }
    doc.flush().map_err(ApplyError::Flush)?;

    Ok(ApplyReport {
        applied: total,
        skipped: plan.skipped(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::plan::{plan_whole_file, EditOperation};

    /// Records operations instead of applying them.
    #[derive(Default)]
    struct Recorder {
        content: Vec<u8>,
        seen: Vec<EditOperation>,
        fail_at: Option<usize>,
        flushed: bool,
    }

    impl DocumentSource for Recorder {
        fn read_document(&self) -> Result<Vec<u8>, DocumentError> {
            Ok(self.content.clone())
        }

        fn read_live(&self) -> Result<Vec<u8>, DocumentError> {
            Ok(self.content.clone())
        }
    }

    impl DocumentSink for Recorder {
        fn apply_edit(&mut self, op: &EditOperation) -> Result<(), DocumentError> {
            if self.fail_at == Some(self.seen.len()) {
                return Err(DocumentError::InvalidRange {
                    byte_start: op.byte_start,
                    byte_end: op.byte_end,
                    len: 0,
                });
            }
            self.seen.push(op.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DocumentError> {
            self.flushed = true;
            Ok(())
        }
    }

    #[test]
    fn test_apply_reproduces_new() {
        let old = b"a\nb\nc\nd\n";
        let new = b"a\nB\nc\nd\ne\n";
        let plan = plan_whole_file(old, new);
        let mut doc = MemoryDocument::new(old.to_vec());

        let report = apply_plan(&plan, old, &mut doc).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(doc.live(), new);
    }

    #[test]
    fn test_stale_document_is_untouched() {
        let old = b"a\nb\nc\n";
        let new = b"a\nx\nc\n";
        let plan = plan_whole_file(old, new);
        let mut doc = MemoryDocument::new(old.to_vec());
        doc.set_live("a\nb\nc\nuser typing\n");

        let result = apply_plan(&plan, old, &mut doc);
        assert!(matches!(result, Err(ApplyError::Stale { .. })));
        assert_eq!(doc.live(), b"a\nb\nc\nuser typing\n");
    }

    #[test]
    fn test_stale_document_sees_no_operations() {
        let old = b"a\nb\n";
        let plan = plan_whole_file(old, b"b\n");
        let mut recorder = Recorder {
            content: b"changed\n".to_vec(),
            ..Default::default()
        };

        assert!(apply_plan(&plan, old, &mut recorder).is_err());
        assert!(recorder.seen.is_empty());
        assert!(!recorder.flushed);
    }

    #[test]
    fn test_operations_delivered_in_plan_order() {
        let old = b"1\n2\n3\n4\n5\n";
        let new = b"one\n2\n3\nfour\n5\nsix\n";
        let plan = plan_whole_file(old, new);
        let mut recorder = Recorder {
            content: old.to_vec(),
            ..Default::default()
        };

        apply_plan(&plan, old, &mut recorder).unwrap();
        assert_eq!(recorder.seen, plan.operations());
        assert!(recorder.flushed);
    }

    #[test]
    fn test_sink_failure_aborts_remaining() {
        let old = b"1\n2\n3\n4\n5\n";
        let new = b"one\n2\n3\nfour\n5\nsix\n";
        let plan = plan_whole_file(old, new);
        let mut recorder = Recorder {
            content: old.to_vec(),
            fail_at: Some(1),
            ..Default::default()
        };

        let result = apply_plan(&plan, old, &mut recorder);
        assert!(matches!(result, Err(ApplyError::Sink { index: 2, .. })));
        assert_eq!(recorder.seen.len(), 1);
        assert!(!recorder.flushed);
    }

    #[test]
    fn test_noop_plan_skips_guard() {
        let plan = EditPlan::default();
        let mut doc = MemoryDocument::new("x");
        doc.set_live("y");
        let report = apply_plan(&plan, b"x", &mut doc).unwrap();
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_ensure_fresh() {
        assert!(ensure_fresh(b"same", b"same").is_ok());
        let err = ensure_fresh(b"same", b"different").unwrap_err();
        assert!(err.to_string().contains("modified since snapshot"));
    }
}

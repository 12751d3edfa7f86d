//! One reformat cycle for one document.
//!
//! Snapshot the document, run the formatter, plan the edits (whole file or
//! leading region only) and apply them behind the staleness guard. Every
//! failure is local to the document being processed.

use crate::apply::{apply_plan, ApplyError};
use crate::document::{DocumentError, DocumentSink, DocumentSource};
use crate::formatter::{FormatterError, FormatterInvocation};
use crate::plan::{plan_whole_file, EditPlan};
use crate::region::{plan_region, RegionRule};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    WholeFile,
    TopRegion(RegionRule),
}

impl Mode {
    /// Plan the edits turning `old` into `new` under this mode.
    pub fn plan(&self, old: &[u8], new: &[u8]) -> EditPlan {
        match self {
            Mode::WholeFile => plan_whole_file(old, new),
            Mode::TopRegion(rule) => plan_region(rule, old, new),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "ReformatOutcome reports whether the document changed"]
pub enum ReformatOutcome {
    /// Formatter output matched the document (or its leading region).
    Unchanged,
    Applied { operations: usize, skipped: usize },
}

#[derive(Error, Debug)]
pub enum ReformatError {
    #[error("cannot read document: {0}")]
    Read(#[source] DocumentError),

    #[error(transparent)]
    Formatter(#[from] FormatterError),

    #[error("skipped update: {0}")]
    Apply(#[from] ApplyError),
}

impl ReformatError {
    /// Failures that are reported without fanfare: unreadable documents and
    /// ordinary formatter complaints.
    pub fn is_quiet(&self) -> bool {
        match self {
            ReformatError::Read(_) => true,
            ReformatError::Formatter(err) => err.is_quiet(),
            ReformatError::Apply(_) => false,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, ReformatError::Apply(ApplyError::Stale { .. }))
    }
}

/// Reformat the document at `path` and resynchronise `doc` with the result.
pub fn reformat_document<D, F>(
    doc: &mut D,
    path: &Path,
    formatter: &F,
    mode: &Mode,
) -> Result<ReformatOutcome, ReformatError>
where
    D: DocumentSource + DocumentSink + ?Sized,
    F: FormatterInvocation + ?Sized,
{
    let _span = tracing::info_span!("reformat", path = %path.display()).entered();

    let old = doc.read_document().map_err(ReformatError::Read)?;
    let new = formatter.format(path)?;

    if old == new {
        tracing::debug!("formatter output unchanged");
        return Ok(ReformatOutcome::Unchanged);
    }

    let plan = mode.plan(&old, &new);
    if plan.is_empty() {
        tracing::debug!("nothing to resynchronise");
        return Ok(ReformatOutcome::Unchanged);
    }

    let report = apply_plan(&plan, &old, doc)?;

    tracing::info!(
        operations = report.applied,
        skipped = report.skipped,
        "resynchronised with formatter output"
    );

    Ok(ReformatOutcome::Applied {
        operations: report.applied,
        skipped: report.skipped,
    })
}

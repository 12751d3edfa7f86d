//! fmt-sync: resynchronise a live document with formatter output
//!
//! Given the current content of a document and the output of an external
//! formatter, compute a minimal line diff and turn it into range-replacement
//! operations that can be applied to a live, re-addressable buffer without
//! disturbing anything the formatter did not touch.
//!
//! # Architecture
//!
//! - [`lines`] locates lines inside raw byte buffers.
//! - [`diff`] computes [`ChangeRecord`]s between two snapshots.
//! - [`plan`] turns change records into [`EditOperation`]s ordered last to
//!   first, all addressed in the original document's coordinates.
//! - [`region`] is the single-operation variant that only resynchronises the
//!   leading region (e.g. the import block).
//! - [`apply`] hands a plan to a [`DocumentSink`] behind a staleness guard.
//!
//! # Safety
//!
//! - A plan is only applied if the live document still matches the snapshot
//!   it was computed against; otherwise nothing is applied
//! - Operations run from the end of the document toward the start
//! - File-backed documents are written atomically (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```
//! use fmt_sync::{apply_plan, plan_whole_file, MemoryDocument};
//!
//! let old = b"a\nb\nc\n";
//! let new = b"a\nx\nc\n";
//!
//! let plan = plan_whole_file(old, new);
//! let mut doc = MemoryDocument::new(old.to_vec());
//! apply_plan(&plan, old, &mut doc).unwrap();
//! assert_eq!(doc.live(), new);
//! ```

pub mod apply;
pub mod config;
pub mod diff;
pub mod document;
pub mod formatter;
pub mod lines;
pub mod plan;
pub mod reformat;
pub mod region;

// Re-exports
pub use apply::{apply_plan, ensure_fresh, ApplyError, ApplyReport};
pub use config::{load_from_path, load_from_str, ConfigError, ReformatConfig};
pub use diff::{diff_lines, ChangeKind, ChangeRecord, LineSpan};
pub use document::{DocumentError, DocumentSink, DocumentSource, FileDocument, MemoryDocument};
pub use formatter::{ExternalFormatter, FormatterError, FormatterInvocation};
pub use plan::{plan_edits, plan_whole_file, EditOperation, EditPlan};
pub use reformat::{reformat_document, Mode, ReformatError, ReformatOutcome};
pub use region::{plan_region, RegionRule};

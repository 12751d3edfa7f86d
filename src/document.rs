//! Documents that edit plans are applied to.
//!
//! A document exposes its persisted and live content and accepts
//! byte-range edits. Files on disk are rewritten atomically on flush.

use crate::plan::EditOperation;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Read access to a document: what is persisted, and what is live.
///
/// For an editor the two differ (the window body may have been edited since
/// the last save). For a plain file they are the same bytes read at
/// different moments.
pub trait DocumentSource {
    /// Current persisted content.
    fn read_document(&self) -> Result<Vec<u8>, DocumentError>;

    /// Current live content, consulted by the staleness guard right before
    /// edits are applied.
    fn read_live(&self) -> Result<Vec<u8>, DocumentError>;
}

/// Write access to a live, range-addressable document.
///
/// Operations arrive in the order an [`EditPlan`](crate::plan::EditPlan)
/// lists them and are addressed in the coordinates of the snapshot the plan
/// was computed against.
pub trait DocumentSink {
    fn apply_edit(&mut self, op: &EditOperation) -> Result<(), DocumentError>;

    /// Persist applied edits, if the sink buffers them.
    fn flush(&mut self) -> Result<(), DocumentError> {
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid byte range: [{byte_start}, {byte_end}) in document of length {len}")]
    InvalidRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },
}

fn splice(content: &mut Vec<u8>, op: &EditOperation) -> Result<(), DocumentError> {
    if op.byte_start > op.byte_end || op.byte_end > content.len() {
        return Err(DocumentError::InvalidRange {
            byte_start: op.byte_start,
            byte_end: op.byte_end,
            len: content.len(),
        });
    }
    content.splice(op.byte_range(), op.replacement.iter().copied());
    Ok(())
}

/// An in-memory document whose persisted and live content can diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocument {
    persisted: Vec<u8>,
    live: Vec<u8>,
}

impl MemoryDocument {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        Self {
            persisted: content.clone(),
            live: content,
        }
    }

    /// Simulate an edit made in the live buffer after the last save.
    pub fn set_live(&mut self, content: impl Into<Vec<u8>>) {
        self.live = content.into();
    }

    pub fn live(&self) -> &[u8] {
        &self.live
    }

    pub fn persisted(&self) -> &[u8] {
        &self.persisted
    }
}

impl DocumentSource for MemoryDocument {
    fn read_document(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.persisted.clone())
    }

    fn read_live(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.live.clone())
    }
}

impl DocumentSink for MemoryDocument {
    fn apply_edit(&mut self, op: &EditOperation) -> Result<(), DocumentError> {
        splice(&mut self.live, op)
    }
}

/// A document backed by a file on disk.
///
/// Edits are spliced into an in-memory copy and written back atomically by
/// [`DocumentSink::flush`]. Until the first edit the live content is
/// re-read from disk, so a concurrent writer is visible to the staleness
/// guard.
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    pending: Option<Vec<u8>>,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_disk(&self) -> Result<Vec<u8>, DocumentError> {
        fs::read(&self.path).map_err(|source| DocumentError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

impl DocumentSource for FileDocument {
    fn read_document(&self) -> Result<Vec<u8>, DocumentError> {
        self.read_disk()
    }

    fn read_live(&self) -> Result<Vec<u8>, DocumentError> {
        match &self.pending {
            Some(content) => Ok(content.clone()),
            None => self.read_disk(),
        }
    }
}

impl DocumentSink for FileDocument {
    fn apply_edit(&mut self, op: &EditOperation) -> Result<(), DocumentError> {
        let content = match self.pending.take() {
            Some(content) => content,
            None => self.read_disk()?,
        };
        splice(self.pending.insert(content), op)
    }

    fn flush(&mut self) -> Result<(), DocumentError> {
        let Some(content) = self.pending.take() else {
            return Ok(());
        };
        let to_write_error = |source| DocumentError::Write {
            path: self.path.clone(),
            source,
        };
        atomic_write(&self.path, &content).map_err(to_write_error)?;

        // Bump mtime so watchers and build tools notice the rewrite.
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.path, now).map_err(to_write_error)?;
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem.
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the original permissions; tempfiles are created 0600.
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeKind, LineSpan};

    fn replace(byte_start: usize, byte_end: usize, text: &str) -> EditOperation {
        EditOperation {
            kind: ChangeKind::Change,
            lines: LineSpan::new(1, 1),
            byte_start,
            byte_end,
            replacement: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_memory_document_splice() {
        let mut doc = MemoryDocument::new("hello world");
        doc.apply_edit(&replace(0, 5, "HELLO")).unwrap();
        assert_eq!(doc.live(), b"HELLO world");
        assert_eq!(doc.persisted(), b"hello world");
    }

    #[test]
    fn test_memory_document_rejects_invalid_range() {
        let mut doc = MemoryDocument::new("short");
        let result = doc.apply_edit(&replace(2, 20, "x"));
        assert!(matches!(result, Err(DocumentError::InvalidRange { .. })));
        let result = doc.apply_edit(&replace(4, 2, "x"));
        assert!(matches!(result, Err(DocumentError::InvalidRange { .. })));
        assert_eq!(doc.live(), b"short");
    }

    #[test]
    fn test_file_document_flush_writes_atomically() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"original content").unwrap();

        let mut doc = FileDocument::new(&file_path);
        doc.apply_edit(&replace(0, 8, "modified")).unwrap();
        // Nothing on disk changes until flush.
        assert_eq!(fs::read(&file_path).unwrap(), b"original content");
        assert_eq!(doc.read_live().unwrap(), b"modified content");

        doc.flush().unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "modified content");
    }

    #[test]
    fn test_file_document_live_tracks_disk_before_edits() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"one").unwrap();

        let doc = FileDocument::new(&file_path);
        assert_eq!(doc.read_document().unwrap(), b"one");
        fs::write(&file_path, b"two").unwrap();
        assert_eq!(doc.read_live().unwrap(), b"two");
    }

    #[test]
    fn test_file_document_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = FileDocument::new(temp_dir.path().join("missing.txt"));
        assert!(matches!(doc.read_document(), Err(DocumentError::Read { .. })));
    }

    #[test]
    fn test_flush_without_edits_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"untouched").unwrap();

        let mut doc = FileDocument::new(&file_path);
        doc.flush().unwrap();
        assert_eq!(fs::read(&file_path).unwrap(), b"untouched");
    }
}

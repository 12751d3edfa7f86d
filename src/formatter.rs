//! External formatter invocation.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Marker that identifies an internal formatter failure worth surfacing
/// loudly, as opposed to ordinary diagnostics about the input.
const FATAL_MARKER: &str = "fatal error";

/// Produces the fully reformatted content of a document.
pub trait FormatterInvocation {
    fn format(&self, path: &Path) -> Result<Vec<u8>, FormatterError>;
}

#[derive(Error, Debug)]
pub enum FormatterError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} {}: {status}\n{output}", path.display())]
    Fatal {
        command: String,
        path: PathBuf,
        status: ExitStatus,
        output: String,
    },

    #[error("{output}")]
    Failed {
        command: String,
        path: PathBuf,
        status: ExitStatus,
        output: String,
    },
}

impl FormatterError {
    /// Ordinary formatter complaints (syntax errors in the input, usually)
    /// are reported without the command banner.
    pub fn is_quiet(&self) -> bool {
        matches!(self, FormatterError::Failed { .. })
    }
}

/// Runs `command args... <path>` and takes its stdout as the new content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFormatter {
    pub command: String,
    pub args: Vec<String>,
}

impl ExternalFormatter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl FormatterInvocation for ExternalFormatter {
    fn format(&self, path: &Path) -> Result<Vec<u8>, FormatterError> {
        tracing::debug!(command = %self.command, path = %path.display(), "running formatter");

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|source| FormatterError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        // Diagnostics may land on either stream.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if combined.contains(FATAL_MARKER) {
            Err(FormatterError::Fatal {
                command: self.command.clone(),
                path: path.to_path_buf(),
                status: output.status,
                output: combined,
            })
        } else {
            Err(FormatterError::Failed {
                command: self.command.clone(),
                path: path.to_path_buf(),
                status: output.status,
                output: combined,
            })
        }
    }
}

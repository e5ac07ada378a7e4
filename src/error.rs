//! Error taxonomy for the rewriting core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scanner, patcher and change writer.
///
/// Input problems such as a missing file or a non-Go path are not errors;
/// they are reported as "not applicable" by the caller that hit them.
#[derive(Error, Debug)]
pub enum CtxfmtError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to load package {pattern:?} in {}: {reason}", .dir.display())]
    Load {
        pattern: String,
        dir: PathBuf,
        reason: String,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rewritten source for {} does not parse", .path.display())]
    InvalidOutput { path: PathBuf },
    #[error("overlapping edits at byte {offset}")]
    OverlappingEdits { offset: usize },
}

impl CtxfmtError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CtxfmtError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from parsing a single unit.
    ///
    /// The patcher skips such units and keeps going.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, CtxfmtError::Parse { .. } | CtxfmtError::Read { .. })
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, CtxfmtError>;

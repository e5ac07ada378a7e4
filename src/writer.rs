//! Persisting rewritten units.

use std::fs;

use tracing::{debug, info};

use crate::error::{CtxfmtError, Result};
use crate::syntax::{Edit, SourceUnit};

/// Writes a unit back to disk when, and only when, it changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeWriter;

impl ChangeWriter {
    pub fn new() -> Self {
        Self
    }

    /// Apply `edits` to `unit` and overwrite its file.
    ///
    /// Returns `false` without touching the file when there is nothing to
    /// change. The whole output is built and re-parsed before the write, so
    /// a failure never leaves a partially written file behind.
    pub fn commit(&self, unit: &SourceUnit, edits: &[Edit]) -> Result<bool> {
        if edits.is_empty() {
            return Ok(false);
        }

        let output = unit.print(edits)?;
        if output == unit.source {
            debug!(path = %unit.path.display(), "edits produced identical output");
            return Ok(false);
        }

        if SourceUnit::parse_source(&unit.path, output.clone()).is_err() {
            return Err(CtxfmtError::InvalidOutput {
                path: unit.path.clone(),
            });
        }

        fs::write(&unit.path, &output).map_err(|source| CtxfmtError::Write {
            path: unit.path.clone(),
            source,
        })?;
        info!(path = %unit.path.display(), edits = edits.len(), "rewrote file");

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_go(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_no_edits_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let path = write_go(&temp, "a.go", "package a\n");
        let old = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let unit = SourceUnit::parse(&path).unwrap();
        assert!(!ChangeWriter::new().commit(&unit, &[]).unwrap());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_commit_writes_output() {
        let temp = TempDir::new().unwrap();
        let path = write_go(&temp, "a.go", "package a\n\nfunc f() {}\n");
        let unit = SourceUnit::parse(&path).unwrap();

        let edits = vec![Edit::insert(unit.source.len(), "\nfunc g() {}\n")];
        assert!(ChangeWriter::new().commit(&unit, &edits).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "package a\n\nfunc f() {}\n\nfunc g() {}\n"
        );
    }

    #[test]
    fn test_invalid_output_is_refused() {
        let temp = TempDir::new().unwrap();
        let original = "package a\n\nfunc f() {}\n";
        let path = write_go(&temp, "a.go", original);
        let unit = SourceUnit::parse(&path).unwrap();

        let edits = vec![Edit::insert(unit.source.len(), "func (")];
        let err = ChangeWriter::new().commit(&unit, &edits).unwrap_err();
        assert!(matches!(err, CtxfmtError::InvalidOutput { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }
}

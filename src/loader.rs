//! Package loading: which files belong to a package and what the
//! type-checker says about them.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::diagnostics::{parse_output, Diagnostic};
use crate::error::{CtxfmtError, Result};

/// A loaded package (or set of packages matched by one pattern).
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Source files compiled into the package.
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads and type-checks a package.
pub trait PackageLoader {
    /// Load the packages matching `pattern`, resolved relative to `dir`.
    ///
    /// Failing to load at all is an error; type errors are not, they are
    /// returned as diagnostics.
    fn load(&self, pattern: &str, dir: &Path) -> Result<Package>;
}

/// Loader backed by the `go` command.
///
/// `go list -e -json` enumerates files and `go build -gcflags=-e` reports
/// every type error in the matched packages.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
}

impl GoToolchain {
    /// Use `go` from `PATH`.
    pub fn new() -> Self {
        Self {
            go: PathBuf::from("go"),
        }
    }

    /// Use a specific `go` binary.
    pub fn with_binary(go: impl Into<PathBuf>) -> Self {
        Self { go: go.into() }
    }

    fn load_error(pattern: &str, dir: &Path, reason: impl Into<String>) -> CtxfmtError {
        CtxfmtError::Load {
            pattern: pattern.to_string(),
            dir: dir.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn list(&self, pattern: &str, dir: &Path) -> Result<Vec<ListedPackage>> {
        debug!(go = %self.go.display(), pattern, dir = %dir.display(), "go list");
        let output = Command::new(&self.go)
            .args(["list", "-e", "-json", pattern])
            .current_dir(dir)
            .output()
            .map_err(|e| Self::load_error(pattern, dir, format!("cannot run go: {}", e)))?;

        let packages = decode_listing(&output.stdout)
            .map_err(|e| Self::load_error(pattern, dir, format!("bad go list output: {}", e)))?;

        if packages.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.trim().is_empty() {
                "pattern matched no packages".to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Self::load_error(pattern, dir, reason));
        }

        Ok(packages)
    }

    fn build(&self, pattern: &str, dir: &Path) -> Result<Vec<Diagnostic>> {
        // Main packages write a binary; send it somewhere disposable.
        let out_dir = std::env::temp_dir().join(format!("ctxfmt-build-{}", std::process::id()));
        std::fs::create_dir_all(&out_dir)
            .map_err(|e| Self::load_error(pattern, dir, format!("cannot create build dir: {}", e)))?;
        let mut out_arg = out_dir.as_os_str().to_os_string();
        out_arg.push(std::path::MAIN_SEPARATOR_STR);

        debug!(pattern, dir = %dir.display(), "go build");
        let output = Command::new(&self.go)
            .arg("build")
            .arg("-gcflags=-e")
            .arg("-o")
            .arg(&out_arg)
            .arg(pattern)
            .current_dir(dir)
            .output();

        if let Err(e) = std::fs::remove_dir_all(&out_dir) {
            debug!(error = %e, "could not remove build dir");
        }

        let output =
            output.map_err(|e| Self::load_error(pattern, dir, format!("cannot run go: {}", e)))?;

        // A failing build is the expected case here.
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(parse_output(&stderr, dir))
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageLoader for GoToolchain {
    fn load(&self, pattern: &str, dir: &Path) -> Result<Package> {
        let listed = self.list(pattern, dir)?;

        let mut package = Package::default();
        for pkg in listed {
            if let Some(err) = &pkg.error {
                warn!(package = %pkg.import_path, error = %err.err, "go list reported an error");
                package.diagnostics.push(Diagnostic::message(err.err.clone()));
            }
            package.files.extend(
                pkg.go_files
                    .iter()
                    .chain(pkg.cgo_files.iter())
                    .map(|f| pkg.dir.join(f)),
            );
        }

        package.diagnostics.extend(self.build(pattern, dir)?);
        debug!(
            files = package.files.len(),
            diagnostics = package.diagnostics.len(),
            "package loaded"
        );

        Ok(package)
    }
}

/// One package object from `go list -json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedPackage {
    dir: PathBuf,
    #[serde(default)]
    import_path: String,
    #[serde(default)]
    go_files: Vec<String>,
    #[serde(default)]
    cgo_files: Vec<String>,
    #[serde(default)]
    error: Option<ListError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListError {
    err: String,
}

/// `go list -json` prints a stream of objects, not an array.
fn decode_listing(stdout: &[u8]) -> serde_json::Result<Vec<ListedPackage>> {
    serde_json::Deserializer::from_slice(stdout)
        .into_iter::<ListedPackage>()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_listing_stream() {
        let stdout = br#"{
    "Dir": "/src/app",
    "ImportPath": "example.com/app",
    "Name": "main",
    "GoFiles": ["main.go", "util.go"]
}
{
    "Dir": "/src/app/pkg",
    "ImportPath": "example.com/app/pkg",
    "GoFiles": ["bar.go"],
    "CgoFiles": ["native.go"],
    "Error": {"Err": "something odd"}
}
"#;
        let listed = decode_listing(stdout).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].go_files, vec!["main.go", "util.go"]);
        assert!(listed[0].error.is_none());
        assert_eq!(listed[1].cgo_files, vec!["native.go"]);
        assert_eq!(listed[1].error.as_ref().unwrap().err, "something odd");
    }

    #[test]
    fn test_decode_empty_listing() {
        assert!(decode_listing(b"").unwrap().is_empty());
    }

    #[test]
    fn test_missing_go_binary_is_fatal() {
        let temp = tempfile::TempDir::new().unwrap();
        let loader = GoToolchain::with_binary("/nonexistent/ctxfmt-go");
        let err = loader.load(".", temp.path()).unwrap_err();
        assert!(matches!(err, CtxfmtError::Load { .. }));
    }
}

//! Output formatting for ctxfmt findings.
//!
//! Supports two output formats:
//! - Pretty: one line per finding, in traversal order
//! - JSON: the same findings as an array for programmatic consumption

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::*;
use serde::Serialize;

/// What a finding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A declaration missing the marker parameter.
    Declaration,
    /// A call site missing the marker argument.
    CallSite,
}

/// One dry-run finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// Receiver type or interface name; empty for call sites.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub qualifier: String,
    pub name: String,
    /// The marker type, e.g. `context.Context`.
    pub marker: String,
}

impl Finding {
    /// The plain-text report line.
    pub fn render(&self) -> String {
        match self.kind {
            FindingKind::Declaration => format!(
                "{} at line {}: {}.{}()",
                self.file.display(),
                self.line,
                self.qualifier,
                self.name
            ),
            FindingKind::CallSite => format!(
                "{}:{}:{}: {}() missing {} parameter",
                self.file.display(),
                self.line,
                self.column,
                self.name,
                self.marker
            ),
        }
    }

    fn render_colored(&self) -> String {
        match self.kind {
            FindingKind::Declaration => format!(
                "{} at line {}: {}",
                self.file.display().to_string().blue(),
                self.line,
                format!("{}.{}()", self.qualifier, self.name).bold()
            ),
            FindingKind::CallSite => format!(
                "{}{} {}() missing {} parameter",
                self.file.display().to_string().blue(),
                format!(":{}:{}:", self.line, self.column).dimmed(),
                self.name.bold(),
                self.marker
            ),
        }
    }
}

/// Write findings one per line.
pub fn write_pretty<W: Write>(out: &mut W, findings: &[Finding]) -> io::Result<()> {
    for finding in findings {
        writeln!(out, "{}", finding.render_colored())?;
    }
    Ok(())
}

/// Write findings as a JSON array.
pub fn write_json<W: Write>(out: &mut W, findings: &[Finding]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(findings)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Announce a rewritten file.
pub fn print_processed(path: &Path) {
    println!("{} {}", "processed".green(), path.display());
}

//! Declaration scanner and parameter injector.
//!
//! Walks one file's declarations, finds the eligible ones missing the marker
//! parameter and either reports them or prepends the parameter.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::MarkerConfig;
use crate::error::Result;
use crate::policy::Policy;
use crate::report::{Finding, FindingKind};
use crate::syntax::{self, import_edit, prepend_item, Declaration, DeclarationKind, SourceUnit};
use crate::writer::ChangeWriter;

/// Whether a run reports or rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    DryRun,
    Rewrite,
}

/// Result of scanning one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    /// Dry-run findings in declaration order.
    pub findings: Vec<Finding>,
    /// Whether the file was written.
    pub rewritten: bool,
}

/// Scans files against a policy.
pub struct Injector<'a> {
    policy: &'a Policy,
    mode: Mode,
    writer: ChangeWriter,
}

impl<'a> Injector<'a> {
    pub fn new(policy: &'a Policy, mode: Mode) -> Self {
        Self {
            policy,
            mode,
            writer: ChangeWriter::new(),
        }
    }

    /// Scan (and possibly rewrite) one path.
    ///
    /// Directories, non-Go files, excluded files and unreadable paths are not
    /// applicable and yield an empty outcome. A file that does not parse is
    /// an error.
    pub fn scan_file(&self, path: &Path) -> Result<FileOutcome> {
        if path.is_dir() || !syntax::is_go_file(path) {
            debug!(path = %path.display(), "not a Go source file, skipping");
            return Ok(FileOutcome::default());
        }
        if self.policy.is_file_excluded(path) {
            debug!(path = %path.display(), "excluded by file rules");
            return Ok(FileOutcome::default());
        }

        let source = match fs::read(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file, skipping");
                return Ok(FileOutcome::default());
            }
        };

        if self.policy.skip_generated() && syntax::is_generated(&source) {
            debug!(path = %path.display(), "generated file, skipping");
            return Ok(FileOutcome::default());
        }

        let unit = SourceUnit::parse_source(path, source)?;
        self.scan_unit(&unit)
    }

    /// Scan an already parsed unit.
    pub fn scan_unit(&self, unit: &SourceUnit) -> Result<FileOutcome> {
        let marker = self.policy.marker();
        let mut outcome = FileOutcome::default();
        let mut edits = Vec::new();

        for decl in unit.declarations()? {
            if !is_candidate(self.policy, &decl) || decl.has_marker_param(marker) {
                continue;
            }

            match self.mode {
                Mode::DryRun => outcome.findings.push(Finding {
                    kind: FindingKind::Declaration,
                    file: unit.path.clone(),
                    line: decl.span.start_line,
                    column: decl.span.start_col,
                    qualifier: decl.qualifier().unwrap_or_default().to_string(),
                    name: decl.name.clone(),
                    marker: marker.type_expr(),
                }),
                Mode::Rewrite => {
                    debug!(name = %decl.name, at = %decl.span, "injecting marker parameter");
                    edits.push(prepend_item(&decl.param_list, &marker_param(marker, &decl)));
                }
            }
        }

        if edits.is_empty() {
            return Ok(outcome);
        }

        edits.extend(import_edit(unit, marker));
        outcome.rewritten = self.writer.commit(unit, &edits)?;
        Ok(outcome)
    }
}

/// Whether the injector acts on `decl` at all.
///
/// Methods need an exported name and at least one existing parameter.
/// Free functions are classified but never injected into.
fn is_candidate(policy: &Policy, decl: &Declaration) -> bool {
    match &decl.kind {
        DeclarationKind::FreeFunction => false,
        DeclarationKind::Method { .. } => {
            !decl.params.is_empty()
                && decl.is_exported()
                && policy.is_eligible(decl.category(), &decl.name)
        }
        DeclarationKind::InterfaceMethod { .. } => {
            policy.is_eligible(decl.category(), &decl.name)
        }
    }
}

/// Parameter text for `decl`: named unless its parameters are unnamed.
pub(crate) fn marker_param(marker: &MarkerConfig, decl: &Declaration) -> String {
    if decl.has_unnamed_params() {
        marker.type_expr()
    } else {
        marker.param_decl()
    }
}

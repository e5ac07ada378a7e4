//! Diagnostic-driven call-site patcher.
//!
//! The type-checker is the index of what broke: after declarations gain the
//! marker parameter, every stale call shows up as a "not enough arguments"
//! diagnostic naming the callee. The patcher runs
//! `Diagnose -> Extract -> Locate -> Patch` once per package.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::diagnostics::{Extracted, Extractor};
use crate::error::Result;
use crate::inject::{marker_param, Mode};
use crate::loader::{Package, PackageLoader};
use crate::policy::{Category, Policy};
use crate::report::{Finding, FindingKind};
use crate::syntax::{self, import_edit, prepend_item, DeclarationKind, Edit, SourceUnit};
use crate::writer::ChangeWriter;

/// Names recovered from a package's diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    /// Callees whose call sites lack the marker argument.
    pub calls: BTreeSet<String>,
    /// `(receiver, method)` pairs whose declarations lack the marker
    /// parameter.
    pub implementers: BTreeSet<(String, String)>,
}

impl Targets {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.implementers.is_empty()
    }
}

/// Result of patching one package.
#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    /// Dry-run findings, file by file in package order.
    pub findings: Vec<Finding>,
    /// Files that were written.
    pub rewritten: Vec<PathBuf>,
    pub targets: Targets,
}

/// Repairs call sites (and implementers) broken by parameter injection.
pub struct Patcher<'a, L: PackageLoader> {
    loader: L,
    policy: &'a Policy,
    mode: Mode,
    extractor: Extractor,
    writer: ChangeWriter,
}

impl<'a, L: PackageLoader> Patcher<'a, L> {
    pub fn new(loader: L, policy: &'a Policy, mode: Mode) -> Self {
        Self {
            extractor: Extractor::new(policy.marker()),
            loader,
            policy,
            mode,
            writer: ChangeWriter::new(),
        }
    }

    /// Patch the packages matching `pattern`, resolved from `dir`.
    ///
    /// Loading failures and write failures abort the run. A file that does
    /// not parse is skipped.
    pub fn run(&self, pattern: &str, dir: &Path) -> Result<PatchOutcome> {
        // Diagnose
        let package = self.loader.load(pattern, dir)?;
        debug!(
            files = package.files.len(),
            diagnostics = package.diagnostics.len(),
            "diagnosed package"
        );

        // Extract
        let targets = self.extract(&package);
        let mut outcome = PatchOutcome {
            targets,
            ..Default::default()
        };
        if outcome.targets.is_empty() {
            info!(pattern, "no call sites to patch");
            return Ok(outcome);
        }

        // Locate and patch
        for path in &package.files {
            let Some(unit) = self.locate(path) else {
                continue;
            };
            let edits = self.patch_unit(&unit, &outcome.targets, &mut outcome.findings)?;
            if self.writer.commit(&unit, &edits)? {
                outcome.rewritten.push(unit.path.clone());
            }
        }

        Ok(outcome)
    }

    /// Names of broken callees and implementers, deduplicated.
    pub fn extract(&self, package: &Package) -> Targets {
        let mut targets = Targets::default();
        for diagnostic in &package.diagnostics {
            for name in self.extractor.extract(&diagnostic.message) {
                match name {
                    Extracted::MissingArgument(name) => {
                        targets.calls.insert(name);
                    }
                    Extracted::MissingParameter { receiver, name } => {
                        targets.implementers.insert((receiver, name));
                    }
                }
            }
        }
        targets
    }

    /// Parse one package file fresh, or `None` if it should be skipped.
    fn locate(&self, path: &Path) -> Option<SourceUnit> {
        if self.policy.is_file_excluded(path) {
            debug!(path = %path.display(), "excluded by file rules");
            return None;
        }

        match SourceUnit::parse(path) {
            Ok(unit) if self.policy.skip_generated() && syntax::is_generated(&unit.source) => {
                debug!(path = %path.display(), "generated file, skipping");
                None
            }
            Ok(unit) => Some(unit),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparsable file");
                None
            }
        }
    }

    /// Edits for one unit. In dry-run mode findings are collected instead
    /// and no edits are returned.
    fn patch_unit(
        &self,
        unit: &SourceUnit,
        targets: &Targets,
        findings: &mut Vec<Finding>,
    ) -> Result<Vec<Edit>> {
        let marker = self.policy.marker();
        let mut edits = Vec::new();

        for call in unit.call_sites()? {
            if !targets.calls.contains(&call.name) || call.has_marker_arg(marker) {
                continue;
            }
            match self.mode {
                Mode::DryRun => findings.push(Finding {
                    kind: FindingKind::CallSite,
                    file: unit.path.clone(),
                    line: call.span.start_line,
                    column: call.span.start_col,
                    qualifier: String::new(),
                    name: call.name.clone(),
                    marker: marker.type_expr(),
                }),
                Mode::Rewrite => {
                    debug!(name = %call.name, at = %call.span, "patching call site");
                    edits.push(prepend_item(&call.args, &marker.placeholder));
                }
            }
        }

        if !targets.implementers.is_empty() {
            for decl in unit.declarations()? {
                let DeclarationKind::Method { receiver } = &decl.kind else {
                    continue;
                };
                if !targets.implementers.contains(&(receiver.clone(), decl.name.clone()))
                    || decl.has_marker_param(marker)
                    || !self.policy.is_eligible(Category::Method, &decl.name)
                {
                    continue;
                }
                match self.mode {
                    Mode::DryRun => findings.push(Finding {
                        kind: FindingKind::Declaration,
                        file: unit.path.clone(),
                        line: decl.span.start_line,
                        column: decl.span.start_col,
                        qualifier: receiver.clone(),
                        name: decl.name.clone(),
                        marker: marker.type_expr(),
                    }),
                    Mode::Rewrite => {
                        debug!(name = %decl.name, at = %decl.span, "syncing implementer");
                        edits.push(prepend_item(&decl.param_list, &marker_param(marker, &decl)));
                    }
                }
            }
        }

        if !edits.is_empty() {
            edits.extend(import_edit(unit, marker));
        }
        Ok(edits)
    }
}

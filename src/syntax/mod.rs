//! Go syntax adapter built on tree-sitter.
//!
//! This module owns everything that touches the parse tree:
//! - `SourceUnit`: one parsed file plus its imports
//! - `facts`: declarations, call sites and imports lifted out of the tree
//! - `edit`: byte-range edits and the printer that applies them
//!
//! Trees are never mutated in place. A rewrite is a list of [`Edit`]s against
//! the original text; printing applies them to a fresh buffer.

mod edit;
mod facts;
mod go;

pub use edit::{apply_edits, import_edit, prepend_item, Edit};
pub use facts::{
    Argument, CallSite, Declaration, DeclarationKind, Import, ItemAnchor, ListAnchor, Parameter,
    Span, TypeRef,
};

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tree_sitter::{Language, Parser, Tree};

use crate::error::{CtxfmtError, Result};

/// Shared Go grammar.
static GO_LANGUAGE: Lazy<Language> = Lazy::new(|| tree_sitter_go::LANGUAGE.into());

lazy_static! {
    /// Standard marker for generated Go files.
    static ref GENERATED_HEADER: Regex =
        Regex::new(r"(?m)^// Code generated .* DO NOT EDIT\.\r?$").unwrap();
}

pub(crate) fn language() -> &'static Language {
    &GO_LANGUAGE
}

/// Whether `source` carries the `// Code generated ... DO NOT EDIT.` header.
pub fn is_generated(source: &[u8]) -> bool {
    GENERATED_HEADER.is_match(source)
}

/// Whether `path` names a Go source file.
pub fn is_go_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "go")
}

/// One Go source file: its text, its tree and its imports.
pub struct SourceUnit {
    pub path: PathBuf,
    /// The original source text; edits are expressed against it.
    pub source: Vec<u8>,
    pub tree: Tree,
    pub imports: Vec<Import>,
}

impl SourceUnit {
    /// Read and parse a file.
    pub fn parse(path: &Path) -> Result<Self> {
        let source = fs::read(path).map_err(|source| CtxfmtError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_source(path, source)
    }

    /// Parse already-loaded source text.
    ///
    /// A tree containing syntax errors is rejected: it cannot be rewritten
    /// safely.
    pub fn parse_source(path: impl Into<PathBuf>, source: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let mut parser = Parser::new();
        parser
            .set_language(language())
            .map_err(|e| CtxfmtError::parse(&path, e.to_string()))?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| CtxfmtError::parse(&path, "parser returned no tree"))?;

        if tree.root_node().has_error() {
            return Err(CtxfmtError::parse(&path, "source contains syntax errors"));
        }

        let mut unit = Self {
            path,
            source,
            tree,
            imports: Vec::new(),
        };
        unit.imports = go::imports(&unit)?;
        Ok(unit)
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Functions, methods and interface methods, in source order.
    pub fn declarations(&self) -> Result<Vec<Declaration>> {
        go::declarations(self)
    }

    /// Calls through a selector, in source order.
    pub fn call_sites(&self) -> Result<Vec<CallSite>> {
        go::call_sites(self)
    }

    /// Whether the file imports `path` (under any local name).
    pub fn has_import(&self, path: &str) -> bool {
        self.imports.iter().any(|i| i.path == path)
    }

    /// Whether `path` is imported under the local name `name`.
    ///
    /// An unnamed import binds the package's own name, which is assumed to
    /// be `name`.
    pub fn binds_import(&self, path: &str, name: &str) -> bool {
        self.imports
            .iter()
            .any(|i| i.path == path && i.alias.as_deref().map_or(true, |alias| alias == name))
    }

    /// Serialize this unit with `edits` applied.
    pub fn print(&self, edits: &[Edit]) -> Result<Vec<u8>> {
        apply_edits(&self.source, edits)
    }
}

//! Byte-range edits and the printer that applies them.

use tree_sitter::Node;

use super::facts::ListAnchor;
use super::go::line_indent;
use super::SourceUnit;
use crate::config::MarkerConfig;
use crate::error::{CtxfmtError, Result};

/// Replace `source[start..end]` with `text`. Insertions have `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    /// A zero-width insertion at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            start: offset,
            end: offset,
            text: text.into(),
        }
    }
}

/// Apply `edits` to `source`, producing a new buffer.
///
/// Insertions at the same offset keep their relative order. Overlapping
/// replacements are rejected.
pub fn apply_edits(source: &[u8], edits: &[Edit]) -> Result<Vec<u8>> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    // Stable: equal offsets stay in submission order
    ordered.sort_by_key(|e| e.start);

    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = Vec::with_capacity(source.len() + extra);
    let mut cursor = 0;

    for edit in ordered {
        if edit.start < cursor || edit.end < edit.start || edit.end > source.len() {
            return Err(CtxfmtError::OverlappingEdits { offset: edit.start });
        }
        out.extend_from_slice(&source[cursor..edit.start]);
        out.extend_from_slice(edit.text.as_bytes());
        cursor = edit.end;
    }
    out.extend_from_slice(&source[cursor..]);

    Ok(out)
}

/// Insert `item` as the new first element of a `(...)` list.
pub fn prepend_item(list: &ListAnchor, item: &str) -> Edit {
    match &list.first_item {
        None => Edit::insert(list.open, item),
        Some(first) if first.same_line => Edit::insert(first.start_byte, format!("{}, ", item)),
        Some(first) => Edit::insert(first.start_byte, format!("{},\n{}", item, first.indent)),
    }
}

/// The edit that makes `marker.package` refer to `marker.import_path` in
/// `unit`, or `None` if an import already binds it.
///
/// An import of the same path under another local name (`stdctx`, `_`,
/// `.`) does not bind the marker package, so a plain import is added next
/// to it.
pub fn import_edit(unit: &SourceUnit, marker: &MarkerConfig) -> Option<Edit> {
    let path = marker.import_path.as_str();
    if unit.binds_import(path, &marker.package) {
        return None;
    }
    let quoted = format!("\"{}\"", path);
    let root = unit.tree.root_node();

    let mut cursor = root.walk();
    let first_import = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "import_declaration");

    let Some(decl) = first_import else {
        let mut cursor = root.walk();
        let package = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_clause");
        return Some(match package {
            Some(clause) => Edit::insert(clause.end_byte(), format!("\n\nimport {}", quoted)),
            None => Edit::insert(0, format!("import {}\n\n", quoted)),
        });
    };

    let mut decl_cursor = decl.walk();
    let group = decl
        .named_children(&mut decl_cursor)
        .find(|n| n.kind() == "import_spec_list");

    let Some(group) = group else {
        return Some(group_single_import(unit, decl, path, &quoted));
    };

    let mut group_cursor = group.walk();
    let specs: Vec<Node> = group
        .named_children(&mut group_cursor)
        .filter(|n| n.kind() == "import_spec")
        .collect();
    let section = first_section(unit, &specs);

    // Keep the first section sorted the way gofmt would.
    if let Some(next) = section
        .iter()
        .find(|spec| spec_path(unit, **spec).as_str() > path)
    {
        let indent = line_indent(&unit.source, next.start_byte());
        return Some(Edit::insert(
            next.start_byte(),
            format!("{}\n{}", quoted, indent),
        ));
    }

    match section.last() {
        Some(last) => {
            let indent = line_indent(&unit.source, last.start_byte());
            Some(Edit::insert(last.end_byte(), format!("\n{}{}", indent, quoted)))
        }
        None => Some(Edit::insert(
            group.start_byte() + 1,
            format!("\n\t{}\n", quoted),
        )),
    }
}

/// Rewrite `import "fmt"` as a group holding both imports.
fn group_single_import(unit: &SourceUnit, decl: Node, path: &str, quoted: &str) -> Edit {
    let mut cursor = decl.walk();
    let mut entries: Vec<(String, String)> = decl
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "import_spec")
        .map(|spec| (spec_path(unit, spec), unit.node_text(spec).to_string()))
        .collect();

    let at = entries
        .iter()
        .position(|(p, _)| p.as_str() > path)
        .unwrap_or(entries.len());
    entries.insert(at, (path.to_string(), quoted.to_string()));

    let body: String = entries
        .iter()
        .map(|(_, text)| format!("\t{}\n", text))
        .collect();
    Edit {
        start: decl.start_byte(),
        end: decl.end_byte(),
        text: format!("import (\n{})", body),
    }
}

/// Specs up to the first blank line; later sections hold other import
/// classes (third-party, local).
fn first_section<'s, 't>(unit: &SourceUnit, specs: &'s [Node<'t>]) -> &'s [Node<'t>] {
    let end = specs
        .windows(2)
        .position(|pair| has_blank_line(&unit.source[pair[0].end_byte()..pair[1].start_byte()]))
        .map_or(specs.len(), |i| i + 1);
    &specs[..end]
}

/// Whether the gap between two specs contains an empty line.
fn has_blank_line(gap: &[u8]) -> bool {
    let lines: Vec<&[u8]> = gap.split(|&b| b == b'\n').collect();
    lines.len() > 2
        && lines[1..lines.len() - 1]
            .iter()
            .any(|line| line.iter().all(u8::is_ascii_whitespace))
}

fn spec_path(unit: &SourceUnit, spec: Node) -> String {
    spec.child_by_field_name("path")
        .map(|p| unit.node_text(p).trim_matches('"').to_string())
        .unwrap_or_default()
}

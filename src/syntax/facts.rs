//! Fact structures extracted from a Go syntax tree.

use std::fmt;

use crate::config::MarkerConfig;
use crate::policy::Category;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A type as written in a parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `pkg.Name`
    Qualified { package: String, name: String },
    /// Anything else, kept as source text.
    Other(String),
}

/// One declared parameter. `a, b int` yields two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub type_ref: TypeRef,
}

impl Parameter {
    /// Structural match on the marker type's qualifier and member.
    ///
    /// A renamed import of the marker package does not match.
    pub fn is_marker(&self, marker: &MarkerConfig) -> bool {
        matches!(
            &self.type_ref,
            TypeRef::Qualified { package, name }
                if *package == marker.package && *name == marker.type_name
        )
    }
}

/// Where the first element of a parenthesized list sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAnchor {
    pub start_byte: usize,
    /// Whether the element starts on the same line as `(`.
    pub same_line: bool,
    /// Leading whitespace of the element's line.
    pub indent: String,
}

/// Insertion anchor for a parameter or argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAnchor {
    /// Byte offset just past `(`.
    pub open: usize,
    pub first_item: Option<ItemAnchor>,
}

/// Declaration shapes the scanner understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
    FreeFunction,
    Method { receiver: String },
    InterfaceMethod { interface: String },
}

/// A named callable signature.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Position reported for this declaration.
    pub span: Span,
    pub params: Vec<Parameter>,
    pub param_list: ListAnchor,
}

impl Declaration {
    /// Exported names start with an upper-case letter.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().map_or(false, char::is_uppercase)
    }

    /// The policy category of this declaration.
    pub fn category(&self) -> Category<'_> {
        match &self.kind {
            DeclarationKind::FreeFunction => Category::FreeFunction,
            DeclarationKind::Method { .. } => Category::Method,
            DeclarationKind::InterfaceMethod { interface } => Category::InterfaceMethod {
                interface: interface.as_str(),
            },
        }
    }

    /// Receiver type for methods, interface name for interface methods.
    pub fn qualifier(&self) -> Option<&str> {
        match &self.kind {
            DeclarationKind::FreeFunction => None,
            DeclarationKind::Method { receiver } => Some(receiver),
            DeclarationKind::InterfaceMethod { interface } => Some(interface),
        }
    }

    /// Whether any parameter already has the marker type.
    pub fn has_marker_param(&self, marker: &MarkerConfig) -> bool {
        self.params.iter().any(|p| p.is_marker(marker))
    }

    /// Whether the existing parameters are unnamed (`func(int, string)`).
    ///
    /// Go forbids mixing named and unnamed parameters in one list.
    pub fn has_unnamed_params(&self) -> bool {
        self.params.iter().any(|p| p.name.is_none())
    }
}

/// Shape of the first argument at a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A bare identifier such as `ctx`.
    Identifier(String),
    /// `pkg.X` or `pkg.X(...)`; holds `pkg`.
    Rooted(String),
    Other,
}

/// A call whose callee is a selector: `recv.Name(args)`.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// The selected member name.
    pub name: String,
    /// Position of the receiver expression.
    pub span: Span,
    pub first_arg: Option<Argument>,
    pub args: ListAnchor,
}

impl CallSite {
    /// Whether the call already passes something marker-like first.
    pub fn has_marker_arg(&self, marker: &MarkerConfig) -> bool {
        match &self.first_arg {
            Some(Argument::Identifier(ident)) => *ident == marker.param_name,
            Some(Argument::Rooted(root)) => *root == marker.package,
            _ => false,
        }
    }
}

/// An import spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Import path without quotes.
    pub path: String,
    /// Local name (`log "github.com/sirupsen/logrus"`), if any.
    pub alias: Option<String>,
    pub span: Span,
}

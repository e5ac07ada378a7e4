//! Tree-sitter queries and fact extraction for Go.

use std::collections::HashSet;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::facts::{
    Argument, CallSite, Declaration, DeclarationKind, Import, ItemAnchor, ListAnchor, Parameter,
    Span, TypeRef,
};
use super::{language, SourceUnit};
use crate::error::{CtxfmtError, Result};

/// Tree-sitter query for callable declarations.
///
/// Captures:
/// - `func_name` / `method_name`: declared names
/// - `receiver`: the receiver parameter list of a method
/// - `params`: the parameter list
/// - `interface_name` / `interface_body`: interface type specs
const DECLARATION_QUERY: &str = r#"
(function_declaration
  name: (identifier) @func_name
  parameters: (parameter_list) @params
) @function

(method_declaration
  receiver: (parameter_list) @receiver
  name: (field_identifier) @method_name
  parameters: (parameter_list) @params
) @method

(type_spec
  name: (type_identifier) @interface_name
  type: (interface_type) @interface_body
)
"#;

/// Tree-sitter query for calls through a selector (`x.Foo(...)`).
const CALL_QUERY: &str = r#"
(call_expression
  function: (selector_expression
    operand: (_) @operand
    field: (field_identifier) @member
  )
  arguments: (argument_list) @args
) @call
"#;

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_spec
  name: (_)? @alias
  path: (interpreted_string_literal) @path
) @import
"#;

fn compile(unit: &SourceUnit, source: &str) -> Result<Query> {
    Query::new(language(), source)
        .map_err(|e| CtxfmtError::parse(&unit.path, format!("invalid query: {}", e)))
}

/// Extract declarations in source order.
pub(super) fn declarations(unit: &SourceUnit) -> Result<Vec<Declaration>> {
    let query = compile(unit, DECLARATION_QUERY)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, unit.tree.root_node(), &unit.source[..]);

    let mut declarations = Vec::new();
    let mut seen_positions = HashSet::new();

    while let Some(m) = matches.next() {
        let mut name = None;
        let mut decl_node = None;
        let mut receiver = None;
        let mut params = None;
        let mut interface = None;

        for capture in m.captures {
            let capture_name = query.capture_names()[capture.index as usize];
            match capture_name {
                "func_name" | "method_name" | "interface_name" => name = Some(capture.node),
                "function" | "method" => decl_node = Some(capture.node),
                "receiver" => receiver = Some(capture.node),
                "params" => params = Some(capture.node),
                "interface_body" => interface = Some(capture.node),
                _ => {}
            }
        }

        if let (Some(name), Some(body)) = (name, interface) {
            let interface_name = unit.node_text(name).to_string();
            for method in interface_methods(body) {
                if seen_positions.insert(method.start_byte()) {
                    if let Some(decl) = interface_method(unit, &interface_name, method) {
                        declarations.push(decl);
                    }
                }
            }
            continue;
        }

        let (Some(name), Some(node), Some(params)) = (name, decl_node, params) else {
            continue;
        };
        if !seen_positions.insert(node.start_byte()) {
            continue;
        }

        let kind = match receiver {
            Some(recv) => DeclarationKind::Method {
                receiver: receiver_type(unit, recv),
            },
            None => DeclarationKind::FreeFunction,
        };

        declarations.push(Declaration {
            name: unit.node_text(name).to_string(),
            kind,
            span: Span::from_node(node),
            params: parameters(unit, params),
            param_list: list_anchor(unit, params),
        });
    }

    // Sort by position for deterministic output
    declarations.sort_by_key(|d| d.span.start_byte);

    Ok(declarations)
}

/// Method elements listed directly in an interface body.
fn interface_methods(body: Node) -> Vec<Node> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        // Older grammars call this node `method_spec`.
        .filter(|n| matches!(n.kind(), "method_elem" | "method_spec"))
        .collect()
}

fn interface_method(unit: &SourceUnit, interface: &str, method: Node) -> Option<Declaration> {
    let name = method.child_by_field_name("name")?;
    let params = method.child_by_field_name("parameters")?;
    Some(Declaration {
        name: unit.node_text(name).to_string(),
        kind: DeclarationKind::InterfaceMethod {
            interface: interface.to_string(),
        },
        span: Span::from_node(method),
        params: parameters(unit, params),
        param_list: list_anchor(unit, params),
    })
}

/// Name of the receiver's base type: `(s *Store[T])` yields `Store`.
fn receiver_type(unit: &SourceUnit, receiver: Node) -> String {
    let mut cursor = receiver.walk();
    let decl = receiver
        .named_children(&mut cursor)
        .find(|n| n.kind() == "parameter_declaration");

    let mut ty = match decl.and_then(|d| d.child_by_field_name("type")) {
        Some(ty) => ty,
        None => return String::new(),
    };

    loop {
        let inner = match ty.kind() {
            "pointer_type" | "parenthesized_type" => ty.named_child(0),
            "generic_type" => ty.child_by_field_name("type"),
            _ => None,
        };
        match inner {
            Some(node) => ty = node,
            None => break,
        }
    }

    unit.node_text(ty).to_string()
}

/// Parameters of a parameter list, one entry per declared name.
fn parameters(unit: &SourceUnit, list: Node) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = list.walk();

    for decl in list.named_children(&mut cursor) {
        if !matches!(
            decl.kind(),
            "parameter_declaration" | "variadic_parameter_declaration"
        ) {
            continue;
        }

        let type_ref = decl
            .child_by_field_name("type")
            .map(|ty| type_ref(unit, ty))
            .unwrap_or_else(|| TypeRef::Other(String::new()));

        let mut name_cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| unit.node_text(n).to_string())
            .collect();

        if names.is_empty() {
            params.push(Parameter {
                name: None,
                type_ref,
            });
        } else {
            for name in names {
                params.push(Parameter {
                    name: Some(name),
                    type_ref: type_ref.clone(),
                });
            }
        }
    }

    params
}

fn type_ref(unit: &SourceUnit, ty: Node) -> TypeRef {
    if ty.kind() == "qualified_type" {
        if let (Some(package), Some(name)) = (
            ty.child_by_field_name("package"),
            ty.child_by_field_name("name"),
        ) {
            return TypeRef::Qualified {
                package: unit.node_text(package).to_string(),
                name: unit.node_text(name).to_string(),
            };
        }
    }
    TypeRef::Other(unit.node_text(ty).to_string())
}

/// Insertion anchor for a `(...)` list node.
fn list_anchor(unit: &SourceUnit, list: Node) -> ListAnchor {
    let mut cursor = list.walk();
    let first = list
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");

    ListAnchor {
        open: list.start_byte() + 1,
        first_item: first.map(|item| ItemAnchor {
            start_byte: item.start_byte(),
            same_line: item.start_position().row == list.start_position().row,
            indent: line_indent(&unit.source, item.start_byte()),
        }),
    }
}

/// Leading whitespace of the line containing `offset`, if only whitespace
/// precedes `offset` on that line.
pub(super) fn line_indent(source: &[u8], offset: usize) -> String {
    let line_start = source[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let prefix = &source[line_start..offset];
    if prefix.iter().all(|&b| b == b' ' || b == b'\t') {
        String::from_utf8_lossy(prefix).into_owned()
    } else {
        String::new()
    }
}

/// Extract selector call sites in source order.
pub(super) fn call_sites(unit: &SourceUnit) -> Result<Vec<CallSite>> {
    let query = compile(unit, CALL_QUERY)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, unit.tree.root_node(), &unit.source[..]);

    let mut calls = Vec::new();

    while let Some(m) = matches.next() {
        let mut operand = None;
        let mut member = None;
        let mut args = None;

        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "operand" => operand = Some(capture.node),
                "member" => member = Some(capture.node),
                "args" => args = Some(capture.node),
                _ => {}
            }
        }

        let (Some(operand), Some(member), Some(args)) = (operand, member, args) else {
            continue;
        };

        calls.push(CallSite {
            name: unit.node_text(member).to_string(),
            span: Span::from_node(operand),
            first_arg: first_argument(unit, args),
            args: list_anchor(unit, args),
        });
    }

    calls.sort_by_key(|c| c.span.start_byte);

    Ok(calls)
}

fn first_argument(unit: &SourceUnit, args: Node) -> Option<Argument> {
    let mut cursor = args.walk();
    let first = args
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;

    let argument = match first.kind() {
        "identifier" => Argument::Identifier(unit.node_text(first).to_string()),
        "selector_expression" => selector_root(unit, first),
        "call_expression" => first
            .child_by_field_name("function")
            .filter(|f| f.kind() == "selector_expression")
            .map_or(Argument::Other, |f| selector_root(unit, f)),
        _ => Argument::Other,
    };
    Some(argument)
}

fn selector_root(unit: &SourceUnit, selector: Node) -> Argument {
    match selector.child_by_field_name("operand") {
        Some(op) if op.kind() == "identifier" => Argument::Rooted(unit.node_text(op).to_string()),
        _ => Argument::Other,
    }
}

/// Extract import specs in source order.
pub(super) fn imports(unit: &SourceUnit) -> Result<Vec<Import>> {
    let query = compile(unit, IMPORT_QUERY)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, unit.tree.root_node(), &unit.source[..]);

    let mut imports = Vec::new();

    while let Some(m) = matches.next() {
        let mut path = None;
        let mut alias = None;
        let mut node = None;

        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "path" => path = Some(unit.node_text(capture.node).trim_matches('"').to_string()),
                "alias" => alias = Some(unit.node_text(capture.node).to_string()),
                "import" => node = Some(capture.node),
                _ => {}
            }
        }

        if let (Some(path), Some(node)) = (path, node) {
            imports.push(Import {
                path,
                alias,
                span: Span::from_node(node),
            });
        }
    }

    imports.sort_by_key(|i| i.span.start_byte);

    Ok(imports)
}

//! Structural analysis of Python source via tree-sitter.
//!
//! Only module-scope functions become [`FunctionSignature`]s. Functions owned
//! by a class are summarized on the class, and functions nested inside other
//! function bodies are not recorded because a test cannot address them.
//! Annotation and default text is copied from the source verbatim, never
//! evaluated or re-printed.

use std::collections::BTreeSet;
use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use super::types::{
    ClassSignature, FunctionSignature, LineSpan, MethodSummary, Module, ParamKind, Parameter,
    is_private_name,
};
use crate::error::AnalyzeError;

const FUNCTION_RECEIVERS: &[&str] = &["self"];
const METHOD_RECEIVERS: &[&str] = &["self", "cls"];

/// Parse `source` (the contents of `path`) into a [`Module`].
pub fn parse_module(path: &Path, source: &str) -> Result<Module, AnalyzeError> {
    let tree = parse_tree(path, source)?;
    let root = tree.root_node();
    let src = source.as_bytes();

    let mut functions = Vec::new();
    let mut classes = Vec::new();
    collect_scope(root, src, &mut functions, &mut classes);

    let mut imports = BTreeSet::new();
    collect_imports(root, src, &mut imports);

    Ok(Module {
        path: path.to_path_buf(),
        functions,
        classes,
        imports,
    })
}

/// Source lines covered by `span`, joined with `\n`.
pub fn source_segment(source: &str, span: LineSpan) -> String {
    source
        .lines()
        .skip(span.start.saturating_sub(1))
        .take(span.end + 1 - span.start.max(1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Span of the first function or method named `name`.
pub fn find_unit_span(module: &Module, name: &str) -> Option<LineSpan> {
    module
        .functions
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.lines)
        .or_else(|| {
            module
                .classes
                .iter()
                .flat_map(|c| c.methods.iter())
                .find(|m| m.name == name)
                .map(|m| m.lines)
        })
}

fn parse_tree(path: &Path, source: &str) -> Result<Tree, AnalyzeError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|err| AnalyzeError::Grammar(err.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| AnalyzeError::Grammar("parser produced no tree".to_string()))?;

    let root = tree.root_node();
    let offending = if root.has_error() {
        Some(first_error(root).unwrap_or(root))
    } else {
        first_rejected_construct(root)
    };
    if let Some(node) = offending {
        let position = node.start_position();
        return Err(AnalyzeError::SyntaxParse {
            path: path.to_path_buf(),
            line: position.row + 1,
            column: position.column + 1,
        });
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    children(node)
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

/// Constructs the grammar accepts but Python 3 rejects: Python 2 `print` and
/// `exec` statements, and a required parameter after a defaulted one.
fn first_rejected_construct(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "print_statement" | "exec_statement" => return Some(node),
        "parameters" | "lambda_parameters" => {
            if let Some(param) = required_after_default(node) {
                return Some(param);
            }
        }
        _ => {}
    }
    children(node).into_iter().find_map(first_rejected_construct)
}

/// First positional parameter without a default that follows one with a
/// default. Anything after `*` or `*args` is keyword-only and exempt.
fn required_after_default(params: Node<'_>) -> Option<Node<'_>> {
    let mut seen_default = false;
    for child in named_children(params) {
        match child.kind() {
            "default_parameter" | "typed_default_parameter" => seen_default = true,
            "identifier" if seen_default => return Some(child),
            "typed_parameter" => {
                let plain = named_children(child)
                    .first()
                    .is_some_and(|inner| inner.kind() == "identifier");
                if !plain {
                    return None;
                }
                if seen_default {
                    return Some(child);
                }
            }
            "list_splat_pattern" | "keyword_separator" | "dictionary_splat_pattern" => return None,
            _ => {}
        }
    }
    None
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or_default()
}

fn span(node: Node<'_>) -> LineSpan {
    LineSpan {
        start: node.start_position().row + 1,
        end: node.end_position().row + 1,
    }
}

/// Walk one scope, descending through compound statements (`if`, `try`,
/// `with`, ...) but never into function or class bodies.
fn collect_scope(
    node: Node<'_>,
    src: &[u8],
    functions: &mut Vec<FunctionSignature>,
    classes: &mut Vec<ClassSignature>,
) {
    for child in named_children(node) {
        match child.kind() {
            "function_definition" => functions.push(function_signature(child, Vec::new(), src)),
            "class_definition" => classes.push(class_signature(child, src)),
            "decorated_definition" => {
                let Some(definition) = child.child_by_field_name("definition") else {
                    continue;
                };
                match definition.kind() {
                    "function_definition" => {
                        let decorators = decorator_names(child, src);
                        functions.push(function_signature(definition, decorators, src));
                    }
                    "class_definition" => classes.push(class_signature(definition, src)),
                    _ => {}
                }
            }
            _ => collect_scope(child, src, functions, classes),
        }
    }
}

fn function_signature(node: Node<'_>, decorators: Vec<String>, src: &[u8]) -> FunctionSignature {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_default();
    let parameters = node
        .child_by_field_name("parameters")
        .map(|params| parameters(params, src, FUNCTION_RECEIVERS))
        .unwrap_or_default();
    FunctionSignature {
        is_private: is_private_name(&name),
        name,
        parameters,
        return_type: node
            .child_by_field_name("return_type")
            .map(|n| text(n, src).to_string()),
        docstring: node
            .child_by_field_name("body")
            .and_then(|body| docstring(body, src)),
        decorators,
        lines: span(node),
    }
}

fn class_signature(node: Node<'_>, src: &[u8]) -> ClassSignature {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_default();
    let body = node.child_by_field_name("body");

    let mut methods = Vec::new();
    for item in body.map(named_children).unwrap_or_default() {
        let def = match item.kind() {
            "function_definition" => Some(item),
            "decorated_definition" => item
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(def) = def {
            methods.push(method_summary(def, src));
        }
    }

    ClassSignature {
        is_private: is_private_name(&name),
        name,
        docstring: body.and_then(|b| docstring(b, src)),
        methods,
        lines: span(node),
    }
}

fn method_summary(node: Node<'_>, src: &[u8]) -> MethodSummary {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, src).to_string())
        .unwrap_or_default();
    let params = node
        .child_by_field_name("parameters")
        .map(|params| parameters(params, src, METHOD_RECEIVERS))
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.name)
        .collect();
    MethodSummary {
        is_private: is_private_name(&name),
        name,
        params,
        lines: span(node),
    }
}

/// Ordered, non-variadic parameters minus receivers.
fn parameters(node: Node<'_>, src: &[u8], receivers: &[&str]) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut keyword_only = false;

    for child in named_children(node) {
        let kind = if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        };
        let field = |name: &str| child.child_by_field_name(name).map(|n| text(n, src).to_string());

        let param = match child.kind() {
            "identifier" => Some(Parameter {
                name: text(child, src).to_string(),
                kind,
                annotation: None,
                default: None,
            }),
            "typed_parameter" => match named_children(child).first() {
                Some(inner) if inner.kind() == "identifier" => Some(Parameter {
                    name: text(*inner, src).to_string(),
                    kind,
                    annotation: field("type"),
                    default: None,
                }),
                Some(inner) if inner.kind() == "list_splat_pattern" => {
                    keyword_only = true;
                    None
                }
                _ => None,
            },
            "default_parameter" | "typed_default_parameter" => child
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .map(|n| Parameter {
                    name: text(n, src).to_string(),
                    kind,
                    annotation: field("type"),
                    default: field("value"),
                }),
            "list_splat_pattern" | "keyword_separator" => {
                keyword_only = true;
                None
            }
            _ => None,
        };

        if let Some(param) = param
            && !receivers.contains(&param.name.as_str())
        {
            out.push(param);
        }
    }
    out
}

fn decorator_names(decorated: Node<'_>, src: &[u8]) -> Vec<String> {
    named_children(decorated)
        .into_iter()
        .filter(|child| child.kind() == "decorator")
        .filter_map(|decorator| {
            named_children(decorator)
                .first()
                .and_then(|expr| decorator_name(*expr, src))
        })
        .collect()
}

/// `name` -> name, `a.b` -> b, `f(...)` -> name of `f`, recursively.
fn decorator_name(expr: Node<'_>, src: &[u8]) -> Option<String> {
    match expr.kind() {
        "identifier" => Some(text(expr, src).to_string()),
        "attribute" => expr
            .child_by_field_name("attribute")
            .map(|n| text(n, src).to_string()),
        "call" => expr
            .child_by_field_name("function")
            .and_then(|f| decorator_name(f, src)),
        _ => None,
    }
}

fn docstring(body: Node<'_>, src: &[u8]) -> Option<String> {
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(first).into_iter().next()?;
    if expr.kind() != "string" {
        return None;
    }
    string_literal_body(text(expr, src)).map(clean_docstring)
}

/// Strip prefix and quotes from a plain string literal. Escapes are left as-is.
fn string_literal_body(raw: &str) -> Option<&str> {
    let prefix_len = raw
        .find(|c: char| c == '"' || c == '\'')
        .filter(|&idx| raw[..idx].chars().all(|c| c.is_ascii_alphabetic()))?;
    let prefix = raw[..prefix_len].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    let rest = &raw[prefix_len..];
    ["\"\"\"", "'''", "\"", "'"].into_iter().find_map(|quote| {
        (rest.len() >= 2 * quote.len() && rest.starts_with(quote) && rest.ends_with(quote))
            .then(|| &rest[quote.len()..rest.len() - quote.len()])
    })
}

/// Same normalization as Python's `inspect.cleandoc`.
fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.split('\n').collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start());
    }
    for line in lines.iter().skip(1) {
        cleaned.push(line.get(margin..).unwrap_or(""));
    }

    let start = cleaned.iter().position(|l| !l.trim().is_empty());
    let end = cleaned.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => cleaned[start..=end].join("\n"),
        _ => String::new(),
    }
}

fn collect_imports(node: Node<'_>, src: &[u8], imports: &mut BTreeSet<String>) {
    match node.kind() {
        "import_statement" => {
            for child in named_children(node) {
                let name = match child.kind() {
                    "dotted_name" => Some(child),
                    "aliased_import" => child.child_by_field_name("name"),
                    _ => None,
                };
                if let Some(name) = name {
                    imports.insert(text(name, src).to_string());
                }
            }
        }
        "import_from_statement" => {
            let module = node.child_by_field_name("module_name").and_then(|m| {
                if m.kind() == "relative_import" {
                    named_children(m)
                        .into_iter()
                        .find(|n| n.kind() == "dotted_name")
                } else {
                    Some(m)
                }
            });
            if let Some(module) = module {
                imports.insert(text(module, src).to_string());
            }
        }
        "future_import_statement" => {
            imports.insert("__future__".to_string());
        }
        _ => {
            for child in named_children(node) {
                collect_imports(child, src, imports);
            }
        }
    }
}

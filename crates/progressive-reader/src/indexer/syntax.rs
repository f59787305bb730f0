use super::heuristic::HeuristicIndexer;
use super::StructuralIndexer;
use crate::document::SourceDocument;
use crate::language::Language;
use crate::types::{BoundaryTable, DeclarationBoundary, DeclarationKind, ScanDiagnostics};
use tree_sitter::{Node, Parser};

/// Tree-sitter based indexer for languages with a bundled grammar.
///
/// Walks declaration nodes and descends into the bodies of classes, impl
/// blocks, traits, interfaces and modules. Documents without a grammar are
/// handed to the [`HeuristicIndexer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxIndexer;

/// Result of a syntax scan
#[derive(Debug, Clone)]
pub struct SyntaxScan {
    pub table: BoundaryTable,
    /// True when the parse tree has no error or missing nodes
    pub clean: bool,
}

impl SyntaxIndexer {
    pub fn new() -> Self {
        Self
    }

    /// Parse the document. Returns `None` when the language has no grammar
    /// or the parser gives up.
    pub fn scan(&self, document: &SourceDocument) -> Option<SyntaxScan> {
        let language = document.language();
        if !language.has_grammar() {
            log::debug!("no bundled grammar for {}, skipping syntax scan", language.as_str());
            return None;
        }
        let grammar = language.tree_sitter_language()?;

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            log::warn!("Failed to load {} grammar: {e}", language.as_str());
            return None;
        }

        let source = document.text();
        let Some(tree) = parser.parse(source, None) else {
            log::warn!("tree-sitter produced no tree for {}", document.name().unwrap_or("<text>"));
            return None;
        };
        let root = tree.root_node();

        let mut entries = Vec::new();
        collect(language, root, 0, None, source, &mut entries);
        separate_siblings(&mut entries);

        let diagnostics = ScanDiagnostics {
            unbalanced_delimiters: count_error_nodes(root),
            unterminated_declarations: entries.iter().filter(|e| !e.terminated).count(),
            unterminated_literals: 0,
        };

        Some(SyntaxScan {
            table: BoundaryTable::new(entries, diagnostics),
            clean: !root.has_error(),
        })
    }
}

impl StructuralIndexer for SyntaxIndexer {
    fn index(&self, document: &SourceDocument) -> BoundaryTable {
        match self.scan(document) {
            Some(scan) => scan.table,
            None => HeuristicIndexer::new().index(document),
        }
    }

    fn name(&self) -> &'static str {
        "syntax"
    }
}

/// A declaration node found during the walk
struct Found<'t> {
    kind: DeclarationKind,
    name: Option<String>,
    /// Node whose line range the boundary covers (the export/decorator wrapper if any)
    range: Node<'t>,
    /// Node whose children may hold nested declarations
    body: Option<Node<'t>>,
}

impl<'t> Found<'t> {
    fn new(kind: DeclarationKind, node: Node<'t>, source: &str) -> Self {
        Self {
            kind,
            name: node_name(node, source),
            range: node,
            body: None,
        }
    }

    fn with_body(mut self, body: Option<Node<'t>>) -> Self {
        self.body = body;
        self
    }

    fn wrapped_by(mut self, wrapper: Node<'t>) -> Self {
        self.range = wrapper;
        self
    }

    fn into_boundary(self, depth: usize) -> DeclarationBoundary {
        let start = self.range.start_position();
        let end = self.range.end_position();
        // A node that ends at column 0 ends on the previous line's terminator
        let end_line = if end.column == 0 && end.row > start.row {
            end.row
        } else {
            end.row + 1
        };

        DeclarationBoundary {
            kind: self.kind,
            name: self.name,
            start_line: start.row + 1,
            end_line,
            depth,
            terminated: !self.range.has_error(),
        }
    }
}

fn collect(
    language: Language,
    node: Node,
    depth: usize,
    container: Option<DeclarationKind>,
    source: &str,
    out: &mut Vec<DeclarationBoundary>,
) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();

    // Rust attributes are siblings of the item they annotate
    let mut attribute_row: Option<usize> = None;

    for child in children {
        match child.kind() {
            "attribute_item" => {
                attribute_row.get_or_insert(child.start_position().row);
                continue;
            }
            "line_comment" | "block_comment" => continue,
            _ => {}
        }

        for found in classify(language, child, container, source) {
            let kind = found.kind;
            let body = found.body;
            let mut boundary = found.into_boundary(depth);
            if let Some(row) = attribute_row {
                boundary.start_line = boundary.start_line.min(row + 1);
            }
            out.push(boundary);

            if let Some(body) = body {
                collect(language, body, depth + 1, Some(kind), source, out);
            }
        }
        attribute_row = None;
    }
}

/// Siblings may share a line (`} class B {`); the later one starts on the
/// next line so line ranges nest or stay disjoint. `entries` is in preorder.
fn separate_siblings(entries: &mut [DeclarationBoundary]) {
    let mut ancestors: Vec<usize> = Vec::new();
    let mut closed_through = 0;
    for idx in 0..entries.len() {
        while ancestors.len() > entries[idx].depth {
            if let Some(done) = ancestors.pop() {
                closed_through = closed_through.max(entries[done].end_line);
            }
        }
        let entry = &mut entries[idx];
        if entry.start_line <= closed_through && entry.end_line > closed_through {
            entry.start_line = closed_through + 1;
        }
        ancestors.push(idx);
    }
}

fn classify<'t>(
    language: Language,
    node: Node<'t>,
    container: Option<DeclarationKind>,
    source: &str,
) -> Vec<Found<'t>> {
    match language {
        Language::Rust => rust_declaration(node, container, source).into_iter().collect(),
        Language::Python => python_declaration(node, container, source)
            .into_iter()
            .collect(),
        Language::JavaScript | Language::TypeScript => js_declaration(node, container, source)
            .into_iter()
            .collect(),
        Language::Go => go_declarations(node, source),
        _ => Vec::new(),
    }
}

fn function_kind(container: Option<DeclarationKind>) -> DeclarationKind {
    if container.is_some_and(DeclarationKind::is_container) {
        DeclarationKind::Method
    } else {
        DeclarationKind::Function
    }
}

fn rust_declaration<'t>(
    node: Node<'t>,
    container: Option<DeclarationKind>,
    source: &str,
) -> Option<Found<'t>> {
    let body = node.child_by_field_name("body");
    let found = match node.kind() {
        "function_item" | "function_signature_item" => Found::new(function_kind(container), node, source),
        "struct_item" | "union_item" => Found::new(DeclarationKind::Struct, node, source),
        "enum_item" => Found::new(DeclarationKind::Enum, node, source),
        "trait_item" => Found::new(DeclarationKind::Trait, node, source).with_body(body),
        "mod_item" => Found::new(DeclarationKind::Module, node, source).with_body(body),
        "type_item" => Found::new(DeclarationKind::Type, node, source),
        "macro_definition" => Found::new(DeclarationKind::Other, node, source),
        "impl_item" => Found {
            kind: DeclarationKind::Impl,
            name: impl_target(node, source),
            range: node,
            body,
        },
        _ => return None,
    };
    Some(found)
}

/// `impl<T> Display for Wrapper<T>` -> `Wrapper`
fn impl_target(node: Node, source: &str) -> Option<String> {
    let text = node_text(node.child_by_field_name("type")?, source)?;
    let base = text.split('<').next().unwrap_or(text);
    let name = base.rsplit("::").next().unwrap_or(base);
    let name = name.trim().trim_start_matches('&').trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn python_declaration<'t>(
    node: Node<'t>,
    container: Option<DeclarationKind>,
    source: &str,
) -> Option<Found<'t>> {
    match node.kind() {
        "function_definition" => Some(Found::new(function_kind(container), node, source)),
        "class_definition" => Some(
            Found::new(DeclarationKind::Class, node, source)
                .with_body(node.child_by_field_name("body")),
        ),
        "decorated_definition" => {
            let definition = node.child_by_field_name("definition")?;
            python_declaration(definition, container, source).map(|found| found.wrapped_by(node))
        }
        _ => None,
    }
}

fn js_declaration<'t>(
    node: Node<'t>,
    container: Option<DeclarationKind>,
    source: &str,
) -> Option<Found<'t>> {
    let body = node.child_by_field_name("body");
    let found = match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            Found::new(function_kind(container), node, source)
        }
        "class_declaration" | "abstract_class_declaration" | "class" => {
            Found::new(DeclarationKind::Class, node, source).with_body(body)
        }
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            Found::new(DeclarationKind::Method, node, source)
        }
        "interface_declaration" => {
            Found::new(DeclarationKind::Interface, node, source).with_body(body)
        }
        "enum_declaration" => Found::new(DeclarationKind::Enum, node, source),
        "type_alias_declaration" => Found::new(DeclarationKind::Type, node, source),
        "internal_module" | "module" => {
            Found::new(DeclarationKind::Module, node, source).with_body(body)
        }
        "public_field_definition" | "field_definition" => {
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value) {
                return None;
            }
            Found::new(DeclarationKind::Method, node, source)
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            let declarator = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "variable_declarator")
                .find(|child| child.child_by_field_name("value").is_some_and(is_function_value))?;
            Found {
                kind: function_kind(container),
                name: declarator
                    .child_by_field_name("name")
                    .and_then(|name| node_text(name, source))
                    .map(str::to_string),
                range: node,
                body: None,
            }
        }
        "export_statement" => {
            let mut cursor = node.walk();
            let declaration = node.child_by_field_name("declaration").or_else(|| {
                node.named_children(&mut cursor)
                    .find(|child| child.kind().ends_with("declaration"))
            });
            return match declaration {
                Some(declaration) => js_declaration(declaration, container, source)
                    .map(|found| found.wrapped_by(node)),
                None if node.child_by_field_name("value").is_some() => Some(Found {
                    kind: DeclarationKind::Export,
                    name: None,
                    range: node,
                    body: None,
                }),
                None => None,
            };
        }
        "ambient_declaration" => {
            let inner = node.named_child(0)?;
            return js_declaration(inner, container, source).map(|found| found.wrapped_by(node));
        }
        "expression_statement" => {
            let inner = node.named_child(0)?;
            return match inner.kind() {
                "internal_module" | "module" => js_declaration(inner, container, source)
                    .map(|found| found.wrapped_by(node)),
                "assignment_expression" => {
                    let left = inner.child_by_field_name("left")?;
                    let target = node_text(left, source)?;
                    (target == "module.exports" || target.starts_with("exports.")).then_some(Found {
                        kind: DeclarationKind::Export,
                        name: None,
                        range: node,
                        body: None,
                    })
                }
                _ => None,
            };
        }
        _ => return None,
    };
    Some(found)
}

fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn go_declarations<'t>(node: Node<'t>, source: &str) -> Vec<Found<'t>> {
    match node.kind() {
        "function_declaration" => vec![Found::new(DeclarationKind::Function, node, source)],
        "method_declaration" => vec![Found::new(DeclarationKind::Method, node, source)],
        "type_declaration" => {
            let mut cursor = node.walk();
            let specs: Vec<_> = node
                .named_children(&mut cursor)
                .filter(|child| matches!(child.kind(), "type_spec" | "type_alias"))
                .collect();
            let grouped = specs.len() > 1;

            specs
                .into_iter()
                .map(|spec| {
                    let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
                        Some("struct_type") if spec.kind() == "type_spec" => DeclarationKind::Struct,
                        Some("interface_type") if spec.kind() == "type_spec" => {
                            DeclarationKind::Interface
                        }
                        _ => DeclarationKind::Type,
                    };
                    let found = Found::new(kind, spec, source);
                    if grouped {
                        found
                    } else {
                        found.wrapped_by(node)
                    }
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn node_text<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    source.get(node.byte_range())
}

/// Name from the `name` field, else the first identifier-like child
fn node_name(node: Node, source: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(name, source).map(str::to_string);
    }

    let mut cursor = node.walk();
    let child = node.children(&mut cursor).find(|child| {
        matches!(
            child.kind(),
            "identifier" | "name" | "type_identifier" | "field_identifier" | "property_identifier"
        )
    })?;
    node_text(child, source).map(str::to_string)
}

fn count_error_nodes(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return 1;
    }
    if !node.has_error() {
        return 0;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().map(count_error_nodes).sum()
}

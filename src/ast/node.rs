//! Closed node model the visitors pattern-match on, lowered from tree-sitter.

use std::collections::{HashMap, HashSet};
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn of(node: Node<'_>) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub span: Span,
    pub line: usize,
    pub source: String,
    pub quote: char,
    pub semicolon: bool,
    pub type_only: bool,
    pub default: Option<String>,
    pub named: Vec<ImportSpecifier>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Quoted string; `text` excludes the quotes.
    Str { text: String, span: Span },
    /// `{...}` expression; `text` excludes the braces.
    Expr { text: String, span: Span },
}

impl AttrValue {
    pub fn text(&self) -> &str {
        match self {
            AttrValue::Str { text, .. } | AttrValue::Expr { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxAttribute {
    pub name: String,
    pub name_span: Span,
    pub span: Span,
    pub value: Option<AttrValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Opening,
    Closing,
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxTag {
    pub span: Span,
    pub line: usize,
    pub kind: TagKind,
    pub name: String,
    pub name_span: Span,
    pub attributes: Vec<JsxAttribute>,
    /// Opening tags only: the element has non-whitespace children.
    pub has_children: bool,
}

impl JsxTag {
    pub fn attribute(&self, name: &str) -> Option<&JsxAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub span: Span,
    pub args: Vec<String>,
}

/// `object.property`, where `object` is a plain identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub span: Span,
    pub line: usize,
    pub object: String,
    pub property: String,
    /// Set when the member is the callee of a call expression.
    pub call: Option<CallSite>,
}

/// `const <local> = <hook>()`.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterBinding {
    pub span: Span,
    pub line: usize,
    pub local: String,
    pub hook: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Import(ImportDecl),
    JsxTag(JsxTag),
    Member(MemberAccess),
    RouterBinding(RouterBinding),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkComponent {
    Image,
    Link,
    Head,
    Script,
}

impl FrameworkComponent {
    pub fn from_module(module: &str) -> Option<Self> {
        match module {
            "next/image" | "next/legacy/image" | "next/future/image" => Some(Self::Image),
            "next/link" => Some(Self::Link),
            "next/head" => Some(Self::Head),
            "next/script" => Some(Self::Script),
            _ => None,
        }
    }
}

pub fn is_router_module(module: &str) -> bool {
    matches!(module, "next/router" | "next/navigation")
}

/// Which local names refer to framework components and router objects.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    pub components: HashMap<String, FrameworkComponent>,
    pub router_hooks: HashSet<String>,
    pub router_vars: HashSet<String>,
}

impl Bindings {
    pub fn collect(nodes: &[SyntaxNode]) -> Self {
        let mut bindings = Bindings::default();
        for node in nodes {
            let SyntaxNode::Import(import) = node else { continue };
            if import.type_only {
                continue;
            }
            if let (Some(component), Some(local)) =
                (FrameworkComponent::from_module(&import.source), &import.default)
            {
                bindings.components.insert(local.clone(), component);
            }
            if is_router_module(&import.source) {
                for specifier in import.named.iter().filter(|s| s.imported == "useRouter") {
                    bindings.router_hooks.insert(specifier.local.clone());
                }
            }
        }
        for node in nodes {
            if let SyntaxNode::RouterBinding(b) = node
                && bindings.router_hooks.contains(&b.hook)
            {
                bindings.router_vars.insert(b.local.clone());
            }
        }
        bindings
    }

    pub fn component(&self, local: &str) -> Option<FrameworkComponent> {
        self.components.get(local).copied()
    }

    pub fn is_router_var(&self, name: &str) -> bool {
        self.router_vars.contains(name)
    }
}

const BASE_QUERY: &str = r#"
    (import_statement) @import
    (variable_declarator
        name: (identifier) @local
        value: (call_expression function: (identifier) @hook)) @binding
    (member_expression object: (identifier)) @member
"#;

const JSX_QUERY: &str = r#"
    (jsx_opening_element) @jsx
    (jsx_closing_element) @jsx
    (jsx_self_closing_element) @jsx
"#;

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn line(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Lowers the tree into syntax nodes, in document order.
pub fn lower(
    tree: &Tree,
    language: &Language,
    jsx: bool,
    source: &str,
) -> Result<Vec<SyntaxNode>, tree_sitter::QueryError> {
    let query_str = if jsx {
        format!("{}{}", BASE_QUERY, JSX_QUERY)
    } else {
        BASE_QUERY.to_string()
    };
    let query = Query::new(language, &query_str)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

    let mut nodes = Vec::new();
    while let Some(m) = matches.next() {
        let mut local = None;
        let mut hook = None;
        let mut outer = None;
        let mut outer_name = "";
        for capture in m.captures {
            let name = query.capture_names()[capture.index as usize];
            match name {
                "local" => local = Some(capture.node),
                "hook" => hook = Some(capture.node),
                _ => {
                    outer = Some(capture.node);
                    outer_name = name;
                }
            }
        }
        let Some(node) = outer else { continue };
        let lowered = match outer_name {
            "import" => lower_import(node, source).map(SyntaxNode::Import),
            "member" => lower_member(node, source).map(SyntaxNode::Member),
            "jsx" => lower_jsx(node, source).map(SyntaxNode::JsxTag),
            "binding" => match (local, hook) {
                (Some(l), Some(h)) => Some(SyntaxNode::RouterBinding(RouterBinding {
                    span: Span::of(node),
                    line: line(node),
                    local: text(l, source).to_string(),
                    hook: text(h, source).to_string(),
                })),
                _ => None,
            },
            _ => None,
        };
        nodes.extend(lowered);
    }
    nodes.sort_by_key(|n| match n {
        SyntaxNode::Import(i) => i.span.start,
        SyntaxNode::JsxTag(t) => t.span.start,
        SyntaxNode::Member(m) => m.span.start,
        SyntaxNode::RouterBinding(b) => b.span.start,
    });
    Ok(nodes)
}

fn lower_import(node: Node<'_>, source: &str) -> Option<ImportDecl> {
    let source_node = node.child_by_field_name("source")?;
    let raw = text(source_node, source);
    let quote = raw.chars().next().unwrap_or('\'');
    let statement = text(node, source);

    let mut decl = ImportDecl {
        span: Span::of(node),
        line: line(node),
        source: raw.trim_matches(|c| c == '\'' || c == '"').to_string(),
        quote,
        semicolon: statement.trim_end().ends_with(';'),
        type_only: statement.starts_with("import type "),
        default: None,
        named: Vec::new(),
        namespace: None,
    };

    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause");
    let Some(clause) = clause else {
        return Some(decl);
    };
    let mut clause_cursor = clause.walk();
    for child in clause.named_children(&mut clause_cursor) {
        match child.kind() {
            "identifier" => decl.default = Some(text(child, source).to_string()),
            "namespace_import" => {
                let mut c = child.walk();
                decl.namespace = child
                    .named_children(&mut c)
                    .find(|n| n.kind() == "identifier")
                    .map(|n| text(n, source).to_string());
            }
            "named_imports" => {
                let mut c = child.walk();
                for specifier in child
                    .named_children(&mut c)
                    .filter(|n| n.kind() == "import_specifier")
                {
                    let Some(name) = specifier.child_by_field_name("name") else { continue };
                    let imported = text(name, source).to_string();
                    let local = specifier
                        .child_by_field_name("alias")
                        .map(|a| text(a, source).to_string())
                        .unwrap_or_else(|| imported.clone());
                    decl.named.push(ImportSpecifier { imported, local });
                }
            }
            _ => {}
        }
    }
    Some(decl)
}

fn lower_member(node: Node<'_>, source: &str) -> Option<MemberAccess> {
    let object = node.child_by_field_name("object")?;
    let property = node.child_by_field_name("property")?;
    let call = node.parent().and_then(|parent| {
        let callee = parent.child_by_field_name("function")?;
        if parent.kind() != "call_expression" || callee.id() != node.id() {
            return None;
        }
        let arguments = parent.child_by_field_name("arguments")?;
        let mut c = arguments.walk();
        let args = arguments
            .named_children(&mut c)
            .filter(|a| a.kind() != "comment")
            .map(|a| text(a, source).to_string())
            .collect();
        Some(CallSite {
            span: Span::of(parent),
            args,
        })
    });
    Some(MemberAccess {
        span: Span::of(node),
        line: line(node),
        object: text(object, source).to_string(),
        property: text(property, source).to_string(),
        call,
    })
}

fn lower_jsx(node: Node<'_>, source: &str) -> Option<JsxTag> {
    let kind = match node.kind() {
        "jsx_opening_element" => TagKind::Opening,
        "jsx_closing_element" => TagKind::Closing,
        "jsx_self_closing_element" => TagKind::SelfClosing,
        _ => return None,
    };
    // Fragments have no name.
    let name_node = node.child_by_field_name("name")?;

    let mut attributes = Vec::new();
    let mut cursor = node.walk();
    for attr in node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "jsx_attribute")
    {
        let mut c = attr.walk();
        let parts: Vec<Node<'_>> = attr.named_children(&mut c).collect();
        let Some(name) = parts.first() else { continue };
        let value = parts.get(1).map(|v| {
            let raw = text(*v, source);
            if v.kind() == "string" {
                AttrValue::Str {
                    text: raw.trim_matches(|c| c == '"' || c == '\'').to_string(),
                    span: Span::of(*v),
                }
            } else {
                AttrValue::Expr {
                    text: raw
                        .strip_prefix('{')
                        .and_then(|r| r.strip_suffix('}'))
                        .unwrap_or(raw)
                        .trim()
                        .to_string(),
                    span: Span::of(*v),
                }
            }
        });
        attributes.push(JsxAttribute {
            name: text(*name, source).to_string(),
            name_span: Span::of(*name),
            span: Span::of(attr),
            value,
        });
    }

    let has_children = kind == TagKind::Opening
        && node.parent().is_some_and(|element| {
            let mut c = element.walk();
            element.named_children(&mut c).any(|child| match child.kind() {
                "jsx_opening_element" | "jsx_closing_element" => false,
                "jsx_text" => !text(child, source).trim().is_empty(),
                _ => true,
            })
        });

    Some(JsxTag {
        span: Span::of(node),
        line: line(node),
        kind,
        name: text(name_node, source).to_string(),
        name_span: Span::of(name_node),
        attributes,
        has_children,
    })
}

/// First error or missing node, for parse diagnostics.
pub fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

//! Finds the default-exported request handler of an API module.

use crate::ast::grammar_for;
use tree_sitter::{Node, Parser};

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerBody {
    /// Statement block; `inner` excludes the braces.
    Block { inner: String },
    /// Arrow function returning an expression.
    Expression { expr: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedHandler {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub is_async: bool,
    pub body: HandlerBody,
    /// Byte ranges to drop from the module: the export and the resolved declaration.
    pub remove: Vec<(usize, usize)>,
    /// Wrapper calls (`withAuth(handler)`) the handler was unwrapped from.
    pub wrappers: Vec<String>,
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn is_function(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "generator_function_declaration"
            | "arrow_function"
    )
}

fn has_keyword(node: Node<'_>, keyword: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == keyword)
}

fn param_names(function: Node<'_>, source: &str) -> Vec<String> {
    if let Some(single) = function.child_by_field_name("parameter") {
        return vec![text(single, source).to_string()];
    }
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter(|p| p.kind() != "comment")
        .map(|p| {
            let pattern = p.child_by_field_name("pattern").unwrap_or(p);
            text(pattern, source).to_string()
        })
        .collect()
}

fn describe_function(
    function: Node<'_>,
    source: &str,
    name: Option<String>,
) -> Option<(Option<String>, Vec<String>, bool, HandlerBody)> {
    let body = function.child_by_field_name("body")?;
    let body_text = text(body, source);
    let handler_body = if body.kind() == "statement_block" {
        HandlerBody::Block {
            inner: body_text
                .strip_prefix('{')
                .and_then(|b| b.strip_suffix('}'))
                .unwrap_or(body_text)
                .to_string(),
        }
    } else {
        HandlerBody::Expression {
            expr: body_text.to_string(),
        }
    };
    let name = name.or_else(|| {
        function
            .child_by_field_name("name")
            .map(|n| text(n, source).to_string())
    });
    Some((
        name,
        param_names(function, source),
        has_keyword(function, "async"),
        handler_body,
    ))
}

/// Top-level declaration of `name`: the statement node and the function node.
fn resolve_identifier<'t>(root: Node<'t>, name: &str, source: &str) -> Option<(Node<'t>, Node<'t>)> {
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        // `export function handler` / `export const handler` count too.
        let decl = if stmt.kind() == "export_statement" {
            match stmt.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            stmt
        };
        match decl.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if decl
                    .child_by_field_name("name")
                    .is_some_and(|n| text(n, source) == name)
                {
                    return Some((stmt, decl));
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut c = decl.walk();
                for declarator in decl.named_children(&mut c) {
                    let matches_name = declarator
                        .child_by_field_name("name")
                        .is_some_and(|n| text(n, source) == name);
                    if matches_name && let Some(value) = declarator.child_by_field_name("value") {
                        return Some((stmt, value));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Peels wrapper calls and resolves identifiers down to a function node.
fn unwrap_value<'t>(
    root: Node<'t>,
    value: Node<'t>,
    source: &str,
    located: &mut LocatedHandler,
    depth: usize,
) -> Option<(Node<'t>, Option<String>)> {
    if depth > 8 {
        return None;
    }
    match value.kind() {
        k if is_function(k) => Some((value, None)),
        "identifier" => {
            let name = text(value, source).to_string();
            let (stmt, target) = resolve_identifier(root, &name, source)?;
            located.remove.push((stmt.start_byte(), stmt.end_byte()));
            let (function, _) = unwrap_value(root, target, source, located, depth + 1)?;
            Some((function, Some(name)))
        }
        "call_expression" => {
            let callee = value.child_by_field_name("function")?;
            located.wrappers.push(text(callee, source).to_string());
            let args = value.child_by_field_name("arguments")?;
            let mut c = args.walk();
            let inner = args
                .named_children(&mut c)
                .find(|a| is_function(a.kind()) || a.kind() == "identifier" || a.kind() == "call_expression")?;
            unwrap_value(root, inner, source, located, depth + 1)
        }
        "parenthesized_expression" | "as_expression" | "satisfies_expression" => {
            let mut c = value.walk();
            let inner = value.named_children(&mut c).next()?;
            unwrap_value(root, inner, source, located, depth + 1)
        }
        _ => None,
    }
}

/// Locates the default export; `None` when it is missing or not a function.
pub fn locate_handler(path: &str, source: &str) -> Option<LocatedHandler> {
    let (language, _) = grammar_for(path)?;
    let mut parser = Parser::new();
    parser.set_language(&language).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();

    let mut cursor = root.walk();
    let export = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "export_statement" && has_keyword(*n, "default"))?;

    let mut located = LocatedHandler {
        name: None,
        params: Vec::new(),
        is_async: false,
        body: HandlerBody::Block {
            inner: String::new(),
        },
        remove: vec![(export.start_byte(), export.end_byte())],
        wrappers: Vec::new(),
    };

    let value = export
        .child_by_field_name("declaration")
        .or_else(|| export.child_by_field_name("value"))?;
    let (function, resolved_name) = unwrap_value(root, value, source, &mut located, 0)?;
    let (name, params, is_async, body) = describe_function(function, source, resolved_name)?;
    located.name = name;
    located.params = params;
    located.is_async = is_async;
    located.body = body;
    Some(located)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_function_declaration() {
        let src = "import type { NextApiRequest, NextApiResponse } from 'next';\n\nexport default async function handler(req: NextApiRequest, res: NextApiResponse) {\n  res.status(200).json({ ok: true });\n}\n";
        let h = locate_handler("pages/api/ok.ts", src).unwrap();
        assert_eq!(h.name.as_deref(), Some("handler"));
        assert_eq!(h.params, vec!["req", "res"]);
        assert!(h.is_async);
        assert_eq!(
            h.body,
            HandlerBody::Block {
                inner: "\n  res.status(200).json({ ok: true });\n".to_string()
            }
        );
        assert_eq!(h.remove.len(), 1);
    }

    #[test]
    fn test_identifier_resolved_through_wrapper() {
        let src = "const getUser = async (request, response) => {\n  response.json({});\n};\n\nexport default withAuth(getUser);\n";
        let h = locate_handler("pages/api/user.js", src).unwrap();
        assert_eq!(h.name.as_deref(), Some("getUser"));
        assert_eq!(h.params, vec!["request", "response"]);
        assert_eq!(h.wrappers, vec!["withAuth"]);
        assert_eq!(h.remove.len(), 2);
    }

    #[test]
    fn test_expression_arrow() {
        let src = "export default (req, res) => res.status(200).send('ok');\n";
        let h = locate_handler("pages/api/ping.js", src).unwrap();
        assert_eq!(
            h.body,
            HandlerBody::Expression {
                expr: "res.status(200).send('ok')".to_string()
            }
        );
        assert!(!h.is_async);
    }

    #[test]
    fn test_missing_default_export() {
        assert!(locate_handler("pages/api/x.ts", "export const a = 1;\n").is_none());
    }
}

use crate::ast::node::{FrameworkComponent, ImportDecl, SyntaxNode, is_router_module};
use crate::ast::{Delta, Edit, VisitContext, Visitor};
use crate::diagnostics::DiagnosticCategory;
use crate::rules::imports::{
    HEAD_MODULE, IMAGE_MODULE, ROUTER_MODULE, map_router_specifiers, render_named_import,
};
use crate::scan::extend_statement_end;

/// Rewrites framework imports to their replacement modules.
pub struct ImportVisitor {
    pub components: bool,
    pub routing: bool,
}

impl Visitor for ImportVisitor {
    fn visit(&self, node: &SyntaxNode, cx: &VisitContext<'_>) -> Delta {
        let SyntaxNode::Import(import) = node else {
            return Delta::default();
        };
        if import.type_only {
            return Delta::default();
        }
        match FrameworkComponent::from_module(&import.source) {
            Some(FrameworkComponent::Link) if self.routing => component_import(import, "Link", ROUTER_MODULE),
            Some(FrameworkComponent::Image) if self.components => {
                component_import(import, "Image", IMAGE_MODULE)
            }
            Some(FrameworkComponent::Head) if self.components => head_import(import),
            Some(FrameworkComponent::Script) if self.components => script_import(import, cx),
            Some(_) => Delta::default(),
            None if self.routing && is_router_module(&import.source) => router_import(import, cx),
            None => Delta::default(),
        }
    }
}

fn specifier(imported: &str, local: &str) -> String {
    if imported == local {
        imported.to_string()
    } else {
        format!("{} as {}", imported, local)
    }
}

fn replace_import(import: &ImportDecl, names: &[String], module: &str) -> Edit {
    Edit::replace(
        import.span.start,
        import.span.end,
        render_named_import(names, module, import.quote, import.semicolon),
    )
}

fn component_import(import: &ImportDecl, exported: &str, module: &str) -> Delta {
    let Some(local) = &import.default else {
        return Delta::default();
    };
    Delta::default()
        .edit(replace_import(import, &[specifier(exported, local)], module))
        .change(format!(
            "Line {}: import from '{}' replaced with {{ {} }} from '{}'",
            import.line, import.source, exported, module
        ))
}

/// `Head` becomes `Helmet` (tags renamed by the JSX visitor); other local names stay aliased.
fn head_import(import: &ImportDecl) -> Delta {
    let Some(local) = &import.default else {
        return Delta::default();
    };
    let name = if local == "Head" {
        "Helmet".to_string()
    } else {
        specifier("Helmet", local)
    };
    Delta::default()
        .edit(replace_import(import, &[name], HEAD_MODULE))
        .change(format!(
            "Line {}: next/head replaced with {{ Helmet }} from '{}'",
            import.line, HEAD_MODULE
        ))
}

fn script_import(import: &ImportDecl, cx: &VisitContext<'_>) -> Delta {
    let end = extend_statement_end(cx.source, import.span.end);
    Delta::default()
        .edit(Edit::remove(import.span.start, end))
        .change(format!(
            "Line {}: next/script import removed; <Script> becomes a native <script>",
            import.line
        ))
}

fn router_import(import: &ImportDecl, cx: &VisitContext<'_>) -> Delta {
    let mut delta = Delta::default();
    if let Some(default) = &import.default {
        delta = delta.warn(
            cx.warning(
                "UNSUPPORTED_IMPORT",
                DiagnosticCategory::Routing,
                import.line,
                format!("Default router import '{}' has no react-router equivalent", default),
            )
            .with_suggestion("Use the useNavigate() hook inside components"),
        );
    }

    let (mapped, dropped) = map_router_specifiers(import.named.iter().map(|s| s.imported.as_str()));
    for name in &dropped {
        delta = delta.warn(cx.warning(
            "UNSUPPORTED_IMPORT",
            DiagnosticCategory::Routing,
            import.line,
            format!("'{}' from '{}' has no react-router equivalent and was dropped", name, import.source),
        ));
    }
    if import.named.iter().any(|s| s.imported == "useSearchParams") {
        delta = delta.warn(
            cx.warning(
                "SEARCH_PARAMS_TUPLE",
                DiagnosticCategory::Routing,
                import.line,
                "react-router's useSearchParams() returns a [params, setParams] tuple",
            )
            .with_suggestion("Destructure the first element: const [searchParams] = useSearchParams()"),
        );
    }

    let edit = if mapped.is_empty() {
        Edit::remove(import.span.start, extend_statement_end(cx.source, import.span.end))
    } else {
        replace_import(import, &mapped, ROUTER_MODULE)
    };
    delta.edit(edit).change(format!(
        "Line {}: router import from '{}' replaced with react-router-dom hooks",
        import.line, import.source
    ))
}

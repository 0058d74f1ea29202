use crate::ast::node::{MemberAccess, SyntaxNode};
use crate::ast::{Delta, Edit, VisitContext, Visitor};
use crate::diagnostics::DiagnosticCategory;

/// Rewrites member accesses on variables bound to `useRouter()`.
pub struct RouterMemberVisitor;

impl Visitor for RouterMemberVisitor {
    fn visit(&self, node: &SyntaxNode, cx: &VisitContext<'_>) -> Delta {
        let SyntaxNode::Member(member) = node else {
            return Delta::default();
        };
        if !cx.bindings.is_router_var(&member.object) {
            return Delta::default();
        }
        rewrite_member(member, cx)
    }
}

fn on_member(member: &MemberAccess, text: &str) -> Delta {
    Delta::default()
        .edit(Edit::replace(member.span.start, member.span.end, text))
        .change(format!(
            "Line {}: {}.{} replaced with {}",
            member.line, member.object, member.property, text
        ))
}

fn on_call(member: &MemberAccess, text: String) -> Delta {
    match &member.call {
        Some(call) => Delta::default()
            .edit(Edit::replace(call.span.start, call.span.end, text.clone()))
            .change(format!(
                "Line {}: {}.{}() replaced with {}",
                member.line, member.object, member.property, text
            )),
        None => Delta::default(),
    }
}

fn unsupported(member: &MemberAccess, cx: &VisitContext<'_>, suggestion: &str) -> Delta {
    Delta::default().warn(
        cx.warning(
            "UNSUPPORTED_ROUTER_MEMBER",
            DiagnosticCategory::Routing,
            member.line,
            format!(
                "{}.{} has no react-router equivalent",
                member.object, member.property
            ),
        )
        .with_suggestion(suggestion),
    )
}

fn rewrite_member(member: &MemberAccess, cx: &VisitContext<'_>) -> Delta {
    let first_arg = member
        .call
        .as_ref()
        .and_then(|c| c.args.first().cloned());
    match (member.property.as_str(), member.call.is_some()) {
        ("push", true) => on_member(member, "navigate"),
        ("replace", true) => match first_arg {
            Some(target) => on_call(member, format!("navigate({}, {{ replace: true }})", target)),
            None => unsupported(member, cx, "Pass the target path to navigate(path, { replace: true })"),
        },
        ("back", true) => on_call(member, "navigate(-1)".to_string()),
        ("forward", true) => on_call(member, "navigate(1)".to_string()),
        ("reload", true) => on_call(member, "window.location.reload()".to_string()),
        ("query", false) => on_member(member, "params"),
        ("asPath", false) => on_member(member, "(location.pathname + location.search)"),
        ("pathname", false) => on_member(member, "location.pathname"),
        ("isReady", false) => on_member(member, "true"),
        ("route", false) => on_member(member, "location.pathname").warn(cx.warning(
            "ROUTER_ROUTE_PATTERN",
            DiagnosticCategory::Routing,
            member.line,
            "router.route returned the route pattern; location.pathname is the concrete path",
        )),
        ("prefetch", _) => unsupported(member, cx, "react-router loads route modules on demand"),
        ("refresh", _) => unsupported(member, cx, "Call navigate(0) or revalidate with useRevalidator()"),
        ("events", _) | ("beforePopState", _) => {
            unsupported(member, cx, "Subscribe to location changes with useEffect on useLocation()")
        }
        ("locale", _) | ("locales", _) | ("defaultLocale", _) | ("domainLocales", _) => {
            unsupported(member, cx, "Handle i18n with a dedicated library")
        }
        ("basePath", _) | ("isFallback", _) | ("isPreview", _) | ("isLocaleDomain", _) => {
            unsupported(member, cx, "Remove this check")
        }
        _ => Delta::default(),
    }
}

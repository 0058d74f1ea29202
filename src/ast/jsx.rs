use crate::ast::node::{AttrValue, FrameworkComponent, JsxAttribute, JsxTag, SyntaxNode, TagKind};
use crate::ast::{Delta, Edit, VisitContext, Visitor};
use crate::diagnostics::DiagnosticCategory;

const LINK_DROPPED: &[&str] = &[
    "passHref",
    "legacyBehavior",
    "prefetch",
    "shallow",
    "scroll",
    "locale",
    "as",
];

const IMAGE_DROPPED: &[&str] = &[
    "quality",
    "placeholder",
    "blurDataURL",
    "loader",
    "unoptimized",
    "onLoadingComplete",
    "lazyBoundary",
    "lazyRoot",
    "objectFit",
    "objectPosition",
    "layout",
];

/// Rewrites JSX elements bound to framework components.
pub struct JsxVisitor {
    pub components: bool,
    pub routing: bool,
}

impl Visitor for JsxVisitor {
    fn visit(&self, node: &SyntaxNode, cx: &VisitContext<'_>) -> Delta {
        let SyntaxNode::JsxTag(tag) = node else {
            return Delta::default();
        };
        match cx.bindings.component(&tag.name) {
            Some(FrameworkComponent::Link) if self.routing => link(tag, cx),
            Some(FrameworkComponent::Image) if self.components => image(tag, cx),
            Some(FrameworkComponent::Head) if self.components => head(tag),
            Some(FrameworkComponent::Script) if self.components => script(tag, cx),
            _ => Delta::default(),
        }
    }
}

/// Removes the attribute and the whitespace before it.
fn drop_attribute(attr: &JsxAttribute, source: &str) -> Edit {
    let bytes = source.as_bytes();
    let mut start = attr.span.start;
    while start > 0 && bytes[start - 1].is_ascii_whitespace() {
        start -= 1;
    }
    Edit::remove(start, attr.span.end)
}

fn is_truthy_flag(attr: &JsxAttribute) -> bool {
    match &attr.value {
        None => true,
        Some(AttrValue::Expr { text, .. }) => text != "false",
        Some(AttrValue::Str { .. }) => true,
    }
}

fn link(tag: &JsxTag, cx: &VisitContext<'_>) -> Delta {
    if tag.kind == TagKind::Closing {
        return Delta::default();
    }
    let mut delta = Delta::default();
    for attr in &tag.attributes {
        if attr.name == "href" {
            delta = delta
                .edit(Edit::replace(attr.name_span.start, attr.name_span.end, "to"))
                .change(format!("Line {}: <Link href> renamed to `to`", tag.line));
            if let Some(AttrValue::Expr { text, .. }) = &attr.value
                && text.starts_with('{')
            {
                delta = delta.warn(
                    cx.warning(
                        "LINK_OBJECT_HREF",
                        DiagnosticCategory::Routing,
                        tag.line,
                        "Object href passed to <Link>; react-router expects { pathname, search, hash }",
                    )
                    .with_suggestion("Build the query string into `search`"),
                );
            }
        } else if LINK_DROPPED.contains(&attr.name.as_str()) {
            delta = delta
                .edit(drop_attribute(attr, cx.source))
                .warn(cx.warning(
                    "UNSUPPORTED_PROP",
                    DiagnosticCategory::Routing,
                    tag.line,
                    format!("<Link {}> is not supported by react-router and was removed", attr.name),
                ));
        }
    }
    delta
}

fn image(tag: &JsxTag, cx: &VisitContext<'_>) -> Delta {
    if tag.kind == TagKind::Closing {
        return Delta::default();
    }
    let mut delta = Delta::default();
    let mut has_fill = false;
    for attr in &tag.attributes {
        match attr.name.as_str() {
            "priority" => {
                delta = if is_truthy_flag(attr) {
                    delta
                        .edit(Edit::replace(attr.span.start, attr.span.end, "loading=\"eager\""))
                        .change(format!("Line {}: <Image priority> became loading=\"eager\"", tag.line))
                } else {
                    delta.edit(drop_attribute(attr, cx.source))
                };
            }
            "fill" => {
                has_fill = true;
                if is_truthy_flag(attr) {
                    delta = delta
                        .edit(Edit::replace(attr.span.start, attr.span.end, "layout=\"fullWidth\""))
                        .change(format!("Line {}: <Image fill> became layout=\"fullWidth\"", tag.line));
                }
            }
            name if IMAGE_DROPPED.contains(&name) => {
                delta = delta
                    .edit(drop_attribute(attr, cx.source))
                    .warn(cx.warning(
                        "UNSUPPORTED_PROP",
                        DiagnosticCategory::Component,
                        tag.line,
                        format!("<Image {}> has no @unpic/react equivalent and was removed", name),
                    ));
            }
            _ => {}
        }
    }
    let sized = tag.attribute("width").is_some() && tag.attribute("height").is_some();
    if !sized && !has_fill {
        delta = delta.warn(
            cx.warning(
                "IMAGE_DIMENSIONS",
                DiagnosticCategory::Component,
                tag.line,
                "<Image> without width/height; @unpic/react needs both or layout=\"fullWidth\"",
            )
            .with_suggestion("Add width and height, or layout=\"fullWidth\""),
        );
    }
    delta
}

fn head(tag: &JsxTag) -> Delta {
    // Aliased imports keep their local name; only the default `Head` is renamed.
    if tag.name != "Head" {
        return Delta::default();
    }
    let delta = Delta::default().edit(Edit::replace(tag.name_span.start, tag.name_span.end, "Helmet"));
    if tag.kind == TagKind::Closing {
        delta
    } else {
        delta.change(format!("Line {}: <Head> became <Helmet>", tag.line))
    }
}

fn script(tag: &JsxTag, cx: &VisitContext<'_>) -> Delta {
    let mut delta =
        Delta::default().edit(Edit::replace(tag.name_span.start, tag.name_span.end, "script"));
    if tag.kind == TagKind::Closing {
        return delta;
    }
    delta = delta.change(format!("Line {}: <Script> became a native <script>", tag.line));

    for attr in &tag.attributes {
        match attr.name.as_str() {
            "strategy" => {
                let strategy = attr.value.as_ref().map(|v| v.text().trim_matches(|c| c == '"' || c == '\''));
                delta = match strategy {
                    Some("afterInteractive") => {
                        delta.edit(Edit::replace(attr.span.start, attr.span.end, "async"))
                    }
                    Some("lazyOnload") => {
                        delta.edit(Edit::replace(attr.span.start, attr.span.end, "defer"))
                    }
                    other => delta.edit(drop_attribute(attr, cx.source)).warn(cx.warning(
                        "SCRIPT_STRATEGY",
                        DiagnosticCategory::Component,
                        tag.line,
                        format!(
                            "Script strategy '{}' has no native equivalent and was removed",
                            other.unwrap_or("")
                        ),
                    )),
                };
            }
            "onReady" => {
                delta = delta.edit(drop_attribute(attr, cx.source)).warn(cx.warning(
                    "UNSUPPORTED_PROP",
                    DiagnosticCategory::Component,
                    tag.line,
                    "<Script onReady> was removed; use onLoad",
                ));
            }
            _ => {}
        }
    }
    if tag.has_children {
        delta = delta.warn(cx.warning(
            "SCRIPT_INLINE",
            DiagnosticCategory::Component,
            tag.line,
            "Inline <Script> content now runs as a plain <script> during render",
        ));
    }
    delta
}

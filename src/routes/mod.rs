//! File-system routes to react-router route objects.

pub mod codegen;
pub mod segment;

pub use codegen::render_router_module;
pub use segment::{Segment, SegmentError, convert_path};

use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use segment::{parse_segments, pascal_case, source_path, target_path};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const PAGE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mdx"];
const SPECIAL_PAGES: &[&str] = &["_app", "_document", "_error"];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouterKind {
    Pages,
    App,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NextJsRoute {
    pub path: String,
    /// Source file rendering the route.
    pub component_ref: String,
    pub component_name: String,
    pub is_dynamic: bool,
    pub has_params: bool,
    pub params: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub is_index: bool,
    pub is_catch_all: bool,
    pub is_optional_catch_all: bool,
    pub router: RouterKind,
    #[serde(skip)]
    segments: Vec<Segment>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteComponent {
    pub name: String,
    pub import_path: String,
    pub has_loader: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConvertedRoute {
    pub path: String,
    pub element: String,
    pub index: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<RouteComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConvertedRoute>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteDerivation {
    pub routes: Vec<NextJsRoute>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Where a file sits relative to a routing root.
struct Located<'a> {
    router: RouterKind,
    root: &'a str,
    dirs: Vec<&'a str>,
    stem: &'a str,
    ext: &'a str,
}

fn locate(path: &str) -> Option<Located<'_>> {
    let path = path.strip_prefix("./").unwrap_or(path);
    let (router, root) = ["src/pages/", "pages/", "src/app/", "app/"]
        .iter()
        .find(|root| path.starts_with(**root))
        .map(|root| {
            let kind = if root.ends_with("pages/") {
                RouterKind::Pages
            } else {
                RouterKind::App
            };
            (kind, *root)
        })?;
    let rel = &path[root.len()..];
    let mut parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
    let file = parts.pop()?;
    let (stem, ext) = file.rsplit_once('.')?;
    Some(Located {
        router,
        root,
        dirs: parts,
        stem,
        ext,
    })
}

fn is_layout_file(loc: &Located<'_>) -> bool {
    match loc.router {
        RouterKind::Pages => loc.stem == "_layout",
        RouterKind::App => loc.stem == "layout",
    }
}

/// `pages/_layout.tsx`, `app/dashboard/layout.tsx`.
pub fn is_layout_path(path: &str) -> bool {
    locate(path).is_some_and(|loc| is_layout_file(&loc))
}

/// True when the file renders a route (malformed segments included).
pub fn is_page_path(path: &str) -> bool {
    locate(path).is_some_and(|loc| !is_layout_file(&loc) && route_parts(&loc).is_some())
}

/// Parts of a page that make up its route, or `None` when the file is not a page.
fn route_parts<'a>(loc: &Located<'a>) -> Option<(Vec<&'a str>, bool)> {
    if !PAGE_EXTENSIONS.contains(&loc.ext) || loc.stem.contains('.') {
        // `.d.ts`, `.test.tsx` and friends
        return None;
    }
    match loc.router {
        RouterKind::Pages => {
            if loc.dirs.first() == Some(&"api")
                || (loc.dirs.is_empty() && loc.stem == "api")
                || SPECIAL_PAGES.contains(&loc.stem)
                || loc.stem.starts_with('_')
                || loc.dirs.iter().any(|d| d.starts_with('_'))
            {
                return None;
            }
            let mut parts = loc.dirs.clone();
            if loc.stem == "index" {
                return Some((parts, true));
            }
            parts.push(loc.stem);
            Some((parts, false))
        }
        RouterKind::App => {
            // Private folders and parallel-route slots are not URL segments.
            if loc.dirs.iter().any(|d| d.starts_with('_') || d.starts_with('@')) {
                return None;
            }
            match loc.stem {
                "page" => Some((loc.dirs.clone(), true)),
                "not-found" if loc.dirs.is_empty() => Some((vec!["404"], false)),
                _ => None,
            }
        }
    }
}

struct LayoutInfo {
    file: String,
    router: RouterKind,
    root: String,
    dirs: Vec<String>,
}

/// Derives one route per page file. Pure function of the path list.
pub fn derive_routes<S: AsRef<str>>(paths: &[S]) -> RouteDerivation {
    let mut derivation = RouteDerivation::default();

    let layouts: Vec<LayoutInfo> = paths
        .iter()
        .filter_map(|p| {
            let file = p.as_ref();
            let loc = locate(file)?;
            is_layout_file(&loc).then(|| LayoutInfo {
                file: file.to_string(),
                router: loc.router,
                root: loc.root.to_string(),
                dirs: loc.dirs.iter().map(|d| d.to_string()).collect(),
            })
        })
        .collect();

    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        let file = path.as_ref();
        let Some(loc) = locate(file) else { continue };
        if is_layout_file(&loc) {
            continue;
        }
        let Some((parts, is_index)) = route_parts(&loc) else { continue };

        let segments = match parse_segments(parts.iter().copied()) {
            Ok(segments) => segments,
            Err(e) => {
                derivation.diagnostics.push(
                    Diagnostic::warning(
                        "MALFORMED_ROUTE_SEGMENT",
                        DiagnosticCategory::Routing,
                        format!("Route skipped: {}", e),
                    )
                    .in_file(file)
                    .with_suggestion("Use [param], [...param] or [[...param]]"),
                );
                continue;
            }
        };

        let params: Vec<String> = segments
            .iter()
            .filter_map(|s| s.param().map(str::to_string))
            .collect();
        let layout = nearest_layout(&layouts, &loc).map(|l| l.file.clone());

        let mut name_parts = parts.clone();
        if is_index && loc.router == RouterKind::Pages {
            name_parts.push("index");
        }
        if name_parts.is_empty() {
            name_parts.push("index");
        }
        let base = format!("{}Page", pascal_case(&name_parts));
        let count = name_counts.entry(base.clone()).or_insert(0);
        *count += 1;
        let component_name = if *count == 1 {
            base
        } else {
            format!("{}{}", base, count)
        };

        derivation.routes.push(NextJsRoute {
            path: source_path(&segments),
            component_ref: file.to_string(),
            component_name,
            is_dynamic: !params.is_empty(),
            has_params: !params.is_empty(),
            params,
            layout,
            is_index,
            is_catch_all: segments.iter().any(|s| matches!(s, Segment::CatchAll(_))),
            is_optional_catch_all: segments
                .iter()
                .any(|s| matches!(s, Segment::OptionalCatchAll(_))),
            router: loc.router,
            segments,
        });
    }

    for route in &derivation.routes {
        if let Some(note) = complexity_note(route) {
            derivation.diagnostics.push(note);
        }
    }
    derivation
}

fn nearest_layout<'l>(layouts: &'l [LayoutInfo], loc: &Located<'_>) -> Option<&'l LayoutInfo> {
    layouts
        .iter()
        .filter(|l| {
            l.router == loc.router
                && l.root == loc.root
                && l.dirs.len() <= loc.dirs.len()
                && l.dirs.iter().zip(&loc.dirs).all(|(a, b)| a == b)
        })
        .max_by_key(|l| l.dirs.len())
}

/// Optional catch-all weighs 2, several params 1, a layout 1; mixing reaches 2.
fn complexity_note(route: &NextJsRoute) -> Option<Diagnostic> {
    let mut score = 0;
    let mut reasons = Vec::new();
    if route.is_optional_catch_all {
        score += 2;
        reasons.push("optional catch-all");
    }
    if route.params.len() > 1 {
        score += 1;
        reasons.push("multiple parameters");
    }
    if route.layout.is_some() {
        score += 1;
        reasons.push("layout");
    }
    (score >= 2).then(|| {
        Diagnostic::info(
            "ROUTE_COMPLEXITY",
            DiagnosticCategory::Routing,
            format!("Route {} combines {}; review the nested route", route.path, reasons.join(", ")),
        )
        .in_file(&route.component_ref)
    })
}

fn route_target_path(route: &NextJsRoute) -> String {
    if route.path == "/404" {
        return "*".to_string();
    }
    target_path(&route.segments)
}

fn layout_component(layout_file: &str) -> (String, String) {
    let loc = locate(layout_file);
    let dirs: Vec<&str> = loc.as_ref().map(|l| l.dirs.clone()).unwrap_or_default();
    let prefix_segments = parse_segments(dirs.iter().copied()).unwrap_or_default();
    let name = if dirs.is_empty() {
        "RootLayout".to_string()
    } else {
        format!("{}Layout", pascal_case(&dirs))
    };
    (name, target_path(&prefix_segments))
}

fn relative_to(path: &str, prefix: &str) -> String {
    if prefix == "/" {
        return path.trim_start_matches('/').to_string();
    }
    path.strip_prefix(prefix)
        .map(|rest| rest.trim_start_matches('/').to_string())
        .unwrap_or_else(|| path.trim_start_matches('/').to_string())
}

fn page_route(route: &NextJsRoute, path: String) -> ConvertedRoute {
    let index = path.is_empty();
    ConvertedRoute {
        element: format!("<{} />", route.component_name),
        index,
        path,
        component: Some(RouteComponent {
            name: route.component_name.clone(),
            import_path: route.component_ref.clone(),
            has_loader: false,
        }),
        children: Vec::new(),
    }
}

/// Converts to react-router routes; routes sharing a layout nest under it.
pub fn to_target_routes(routes: &[NextJsRoute]) -> Vec<ConvertedRoute> {
    let mut top: Vec<ConvertedRoute> = Vec::new();
    // Layout file → index in `top`.
    let mut layout_slots: BTreeMap<String, usize> = BTreeMap::new();

    for route in routes {
        let absolute = route_target_path(route);
        let Some(layout_file) = &route.layout else {
            top.push(page_route(route, absolute));
            continue;
        };
        let (layout_name, prefix) = layout_component(layout_file);
        let slot = *layout_slots.entry(layout_file.clone()).or_insert_with(|| {
            top.push(ConvertedRoute {
                path: prefix.clone(),
                element: format!("<{} />", layout_name),
                index: false,
                component: Some(RouteComponent {
                    name: layout_name.clone(),
                    import_path: layout_file.clone(),
                    has_loader: false,
                }),
                children: Vec::new(),
            });
            top.len() - 1
        });
        let child_path = if absolute == "*" {
            absolute
        } else {
            relative_to(&absolute, &prefix)
        };
        top[slot].children.push(page_route(route, child_path));
    }
    top
}

/// Marks route components whose source exports a `loader`.
pub fn mark_loaders(routes: &mut [ConvertedRoute], has_loader: &dyn Fn(&str) -> bool) {
    for route in routes {
        if let Some(component) = route.component.as_mut() {
            component.has_loader = has_loader(&component.import_path);
        }
        mark_loaders(&mut route.children, has_loader);
    }
}

pub fn count_routes(routes: &[ConvertedRoute]) -> usize {
    routes
        .iter()
        .map(|r| 1 + count_routes(&r.children))
        .sum()
}

use crate::config::Syntax;
use crate::routes::ConvertedRoute;
use std::fmt::Write;

/// Directory the generated router module lives in.
pub const ROUTER_MODULE_DIR: &str = "src";

/// Import specifier for `file` as seen from `src/router.*`.
pub fn import_specifier(file: &str) -> String {
    let without_ext = file
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file);
    match without_ext.strip_prefix("src/") {
        Some(rest) => format!("./{}", rest),
        None => format!("../{}", without_ext),
    }
}

fn loader_ident(component: &str) -> String {
    let mut chars = component.chars();
    match chars.next() {
        Some(first) => format!("{}{}Loader", first.to_ascii_lowercase(), chars.as_str()),
        None => "loader".to_string(),
    }
}

fn collect_imports(routes: &[ConvertedRoute], out: &mut Vec<(String, String, bool)>) {
    for route in routes {
        if let Some(c) = &route.component
            && !out.iter().any(|(_, path, _)| *path == c.import_path)
        {
            out.push((c.name.clone(), c.import_path.clone(), c.has_loader));
        }
        collect_imports(&route.children, out);
    }
}

fn render_route(route: &ConvertedRoute, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{}{{", pad);
    if route.index {
        let _ = writeln!(out, "{}  index: true,", pad);
    } else {
        let _ = writeln!(out, "{}  path: '{}',", pad, route.path);
    }
    let _ = writeln!(out, "{}  element: {},", pad, route.element);
    if let Some(c) = &route.component
        && c.has_loader
    {
        let _ = writeln!(out, "{}  loader: {},", pad, loader_ident(&c.name));
    }
    if !route.children.is_empty() {
        let _ = writeln!(out, "{}  children: [", pad);
        for child in &route.children {
            render_route(child, depth + 2, out);
        }
        let _ = writeln!(out, "{}  ],", pad);
    }
    let _ = writeln!(out, "{}}},", pad);
}

/// Source of `src/router.(tsx|jsx)` wiring every route and its loader.
pub fn render_router_module(routes: &[ConvertedRoute], syntax: Syntax) -> String {
    let mut imports = Vec::new();
    collect_imports(routes, &mut imports);

    let mut out = String::new();
    out.push_str("import { createBrowserRouter } from 'react-router-dom';\n");
    for (name, path, has_loader) in &imports {
        if *has_loader {
            let _ = writeln!(
                out,
                "import {}, {{ loader as {} }} from '{}';",
                name,
                loader_ident(name),
                import_specifier(path)
            );
        } else {
            let _ = writeln!(out, "import {} from '{}';", name, import_specifier(path));
        }
    }
    out.push('\n');
    out.push_str("export const router = createBrowserRouter([\n");
    for route in routes {
        render_route(route, 1, &mut out);
    }
    out.push_str("]);\n");
    if syntax.is_typescript() {
        out.push_str("\nexport type AppRouter = typeof router;\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{derive_routes, mark_loaders, to_target_routes};

    #[test]
    fn test_import_specifier() {
        assert_eq!(import_specifier("pages/blog/[id].tsx"), "../pages/blog/[id]");
        assert_eq!(import_specifier("src/pages/index.jsx"), "./pages/index");
    }

    #[test]
    fn test_router_module_wires_loaders_and_children() {
        let d = derive_routes(&["pages/_layout.tsx", "pages/index.tsx", "pages/blog/[id].tsx"]);
        let mut routes = to_target_routes(&d.routes);
        mark_loaders(&mut routes, &|path: &str| path.ends_with("[id].tsx"));
        let module = render_router_module(&routes, Syntax::Typescript);

        assert!(module.contains("import RootLayout from '../pages/_layout';"));
        assert!(module.contains("import BlogIdPage, { loader as blogIdPageLoader } from '../pages/blog/[id]';"));
        assert!(module.contains("        index: true,\n        element: <IndexPage />,"));
        assert!(module.contains("        path: 'blog/:id',\n        element: <BlogIdPage />,\n        loader: blogIdPageLoader,"));
        assert!(module.contains("export type AppRouter"));
    }
}

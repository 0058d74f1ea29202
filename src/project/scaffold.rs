//! Entry files a react-router application needs and a Next.js project lacks.

use crate::config::{BuildTarget, ConversionOptions};
use crate::routes::codegen::ROUTER_MODULE_DIR;
use crate::routes::{ConvertedRoute, render_router_module};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static STYLE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+['"]([^'"]+\.(?:css|scss|sass|less))['"];?"#)
        .expect("valid style import regex")
});

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
    pub description: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>, description: &str) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            description: description.to_string(),
        }
    }
}

/// Resolves `specifier` relative to the directory of `from`; package imports pass through.
fn resolve_relative(from: &str, specifier: &str) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }
    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for piece in specifier.split('/') {
        match piece {
            "." | "" => {}
            ".." => {
                parts.pop()?;
            }
            p => parts.push(p),
        }
    }
    Some(parts.join("/"))
}

/// Global stylesheets imported by `_app`, as specifiers valid from `src/main.*`.
pub fn global_styles(app_path: &str, app_source: &str) -> Vec<String> {
    STYLE_IMPORT
        .captures_iter(app_source)
        .map(|c| match resolve_relative(app_path, &c[1]) {
            Some(project_path) => match project_path.strip_prefix("src/") {
                Some(rest) => format!("./{}", rest),
                None => format!("../{}", project_path),
            },
            None => c[1].to_string(),
        })
        .collect()
}

fn index_html(entry: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n  <head>\n    <meta charset=\"UTF-8\" />\n    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n    <title>App</title>\n  </head>\n  <body>\n    <div id=\"root\"></div>\n    <script type=\"module\" src=\"/{}\"></script>\n  </body>\n</html>\n",
        entry
    )
}

fn main_module(options: &ConversionOptions, styles: &[String]) -> String {
    let helmet = options.replace_framework_components;
    let mut out = String::from(
        "import React from 'react';\nimport ReactDOM from 'react-dom/client';\nimport { RouterProvider } from 'react-router-dom';\n",
    );
    if helmet {
        out.push_str("import { HelmetProvider } from 'react-helmet-async';\n");
    }
    out.push_str("import { router } from './router';\n");
    for style in styles {
        out.push_str(&format!("import '{}';\n", style));
    }
    let root = if options.syntax.is_typescript() {
        "document.getElementById('root')!"
    } else {
        "document.getElementById('root')"
    };
    out.push_str(&format!("\nReactDOM.createRoot({}).render(\n  <React.StrictMode>\n", root));
    if helmet {
        out.push_str("    <HelmetProvider>\n      <RouterProvider router={router} />\n    </HelmetProvider>\n");
    } else {
        out.push_str("    <RouterProvider router={router} />\n");
    }
    out.push_str("  </React.StrictMode>,\n);\n");
    out
}

/// Router module plus, for Vite, `index.html` and the entry module.
/// Nothing is generated when the client router is disabled.
pub fn scaffold_files(
    routes: &[ConvertedRoute],
    options: &ConversionOptions,
    app_shell: Option<(&str, &str)>,
) -> Vec<GeneratedFile> {
    if !options.use_client_router {
        return Vec::new();
    }
    let ext = options.syntax.component_ext();
    let mut files = vec![GeneratedFile::new(
        format!("{}/router.{}", ROUTER_MODULE_DIR, ext),
        render_router_module(routes, options.syntax),
        "react-router route table",
    )];
    if options.target == BuildTarget::Vite {
        let styles = app_shell
            .map(|(path, source)| global_styles(path, source))
            .unwrap_or_default();
        let entry = format!("{}/main.{}", ROUTER_MODULE_DIR, ext);
        files.push(GeneratedFile::new("index.html", index_html(&entry), "Vite HTML entry"));
        files.push(GeneratedFile::new(entry, main_module(options, &styles), "Client entry module"));
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{derive_routes, to_target_routes};

    #[test]
    fn test_global_styles_from_app_shell() {
        let app = "import '../styles/globals.css';\nimport 'nprogress/nprogress.css';\nimport type { AppProps } from 'next/app';\n";
        assert_eq!(
            global_styles("pages/_app.tsx", app),
            vec!["../styles/globals.css", "nprogress/nprogress.css"]
        );
        assert_eq!(global_styles("src/pages/_app.tsx", app)[0], "./styles/globals.css");
    }

    #[test]
    fn test_vite_scaffold() {
        let routes = to_target_routes(&derive_routes(&["pages/index.tsx"]).routes);
        let files = scaffold_files(&routes, &ConversionOptions::default(), None);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/router.tsx", "index.html", "src/main.tsx"]);
        assert!(files[1].content.contains("src=\"/src/main.tsx\""));
        assert!(files[2].content.contains("<HelmetProvider>"));
        assert!(files[2].content.contains("getElementById('root')!"));
    }

    #[test]
    fn test_no_scaffold_without_client_router() {
        let options = ConversionOptions {
            use_client_router: false,
            ..ConversionOptions::default()
        };
        assert!(scaffold_files(&[], &options, None).is_empty());
    }
}

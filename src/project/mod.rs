//! Project-level support: file classification, dependency plan,
//! `next.config.*` migration and scaffold files.

pub mod dependencies;
pub mod next_config;
pub mod scaffold;

pub use dependencies::{DependencyChange, DependencyPlan};

use crate::routes::{is_layout_path, is_page_path};
use serde::Serialize;

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Page,
    Layout,
    AppShell,
    DocumentShell,
    ApiRoute,
    Middleware,
    NextConfig,
    PackageManifest,
    Script,
    Other,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Page => "page",
            FileKind::Layout => "layout",
            FileKind::AppShell => "app shell",
            FileKind::DocumentShell => "document shell",
            FileKind::ApiRoute => "api route",
            FileKind::Middleware => "middleware",
            FileKind::NextConfig => "next config",
            FileKind::PackageManifest => "package manifest",
            FileKind::Script => "script",
            FileKind::Other => "other",
        }
    }

    /// Whether the rewriting stages (AST and rules) run on this file.
    pub fn is_rewritable(&self) -> bool {
        matches!(
            self,
            FileKind::Page | FileKind::Layout | FileKind::AppShell | FileKind::Script
        )
    }
}

fn split_name(path: &str) -> (&str, &str, &str) {
    let (dir, file) = path.rsplit_once('/').unwrap_or(("", path));
    let (stem, ext) = file.rsplit_once('.').unwrap_or((file, ""));
    (dir, stem, ext)
}

pub fn classify(path: &str) -> FileKind {
    let normalized = path.replace('\\', "/");
    let path = normalized.strip_prefix("./").unwrap_or(&normalized);
    let (dir, stem, ext) = split_name(path);

    if path == "package.json" {
        return FileKind::PackageManifest;
    }
    if dir.is_empty() && stem == "next.config" && matches!(ext, "js" | "mjs" | "cjs" | "ts") {
        return FileKind::NextConfig;
    }
    if (dir.is_empty() || dir == "src") && stem == "middleware" && matches!(ext, "ts" | "js") {
        return FileKind::Middleware;
    }
    if !SCRIPT_EXTENSIONS.contains(&ext) {
        return FileKind::Other;
    }
    if path.starts_with("pages/api/") || path.starts_with("src/pages/api/") {
        return FileKind::ApiRoute;
    }
    let in_pages_root = dir == "pages" || dir == "src/pages";
    if in_pages_root && stem == "_app" {
        return FileKind::AppShell;
    }
    if in_pages_root && stem == "_document" {
        return FileKind::DocumentShell;
    }
    if is_layout_path(path) {
        return FileKind::Layout;
    }
    if is_page_path(path) {
        return FileKind::Page;
    }
    FileKind::Script
}

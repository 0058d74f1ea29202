//! Markdown report for a conversion run.

use crate::diagnostics::{Diagnostic, Severity};
use crate::orchestrator::{ConversionResult, FileStatus};
use crate::routes::ConvertedRoute;
use std::collections::BTreeMap;

/// Default file name, written next to the converted tree.
pub const REPORT_FILE: &str = "NEXTPORT_REPORT.md";

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn flatten_routes<'a>(routes: &'a [ConvertedRoute], parent: &str, out: &mut Vec<(String, &'a ConvertedRoute)>) {
    for route in routes {
        let full = match (parent, route.path.as_str()) {
            (p, "") => p.to_string(),
            (_, path) if path.starts_with('/') || path == "*" => path.to_string(),
            ("/", path) => format!("/{}", path),
            (p, path) => format!("{}/{}", p.trim_end_matches('/'), path),
        };
        if route.children.is_empty() {
            out.push((if full.is_empty() { "/".to_string() } else { full }, route));
        } else {
            flatten_routes(&route.children, &full, out);
        }
    }
}

fn diagnostic_line(d: &Diagnostic) -> String {
    let location = match (&d.file, d.line) {
        (Some(file), Some(line)) => format!(" `{}:{}`", file, line),
        (Some(file), None) => format!(" `{}`", file),
        _ => String::new(),
    };
    let mut line = format!("- **{}**{}: {}", d.code, location, d.message);
    if let Some(suggestion) = &d.suggestion {
        line.push_str(&format!(" _({})_", suggestion));
    }
    line.push('\n');
    line
}

#[derive(Default)]
struct Counts {
    critical: usize,
    warning: usize,
    info: usize,
}

impl Counts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    fn total(&self) -> usize {
        self.critical + self.warning + self.info
    }
}

fn count_tables(diagnostics: &[Diagnostic]) -> String {
    let mut by_category: BTreeMap<&str, Counts> = BTreeMap::new();
    let mut by_file: BTreeMap<&str, Counts> = BTreeMap::new();
    for d in diagnostics {
        by_category.entry(d.category.label()).or_default().add(d.severity);
        by_file
            .entry(d.file.as_deref().unwrap_or("(project)"))
            .or_default()
            .add(d.severity);
    }

    let mut md = String::from("### By category\n\n| Category | Critical | Warnings | Notes | Total |\n|---|---|---|---|---|\n");
    for (category, c) in &by_category {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            category,
            c.critical,
            c.warning,
            c.info,
            c.total()
        ));
    }
    md.push_str("\n### By file\n\n| File | Errors | Warnings | Total |\n|---|---|---|---|\n");
    for (file, c) in &by_file {
        md.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            escape_cell(file),
            c.critical,
            c.warning,
            c.total()
        ));
    }
    md.push('\n');
    md
}

pub fn render_markdown(result: &ConversionResult) -> String {
    let mut md = String::from("# nextport conversion report\n\n");
    md.push_str(&format!("- Run: `{}`\n", result.run_id));
    md.push_str(&format!("- Started: {}\n", result.started_at));
    md.push_str(&format!(
        "- Status: {}\n\n",
        if result.success { "success" } else { "failed (critical diagnostics)" }
    ));

    let s = &result.stats;
    md.push_str("## Summary\n\n| Metric | Value |\n|---|---|\n");
    md.push_str(&format!("| Files | {} |\n", s.total_files));
    md.push_str(&format!("| Modified | {} |\n", s.modified_files));
    md.push_str(&format!("| Transformation rate | {:.1}% |\n", s.transformation_rate * 100.0));
    md.push_str(&format!("| Routes | {} |\n", s.route_changes));
    md.push_str(&format!("| API handlers | {} |\n", result.api_handlers.len()));
    md.push_str(&format!("| Dependency changes | {} |\n\n", s.dependency_changes));

    if !result.routes.is_empty() {
        let mut flat = Vec::new();
        flatten_routes(&result.converted_routes, "", &mut flat);
        md.push_str("## Routes\n\n| Path | Component | Loader |\n|---|---|---|\n");
        for (path, route) in flat {
            let (component, loader) = route
                .component
                .as_ref()
                .map(|c| (c.import_path.as_str(), c.has_loader))
                .unwrap_or(("", false));
            md.push_str(&format!(
                "| `{}` | {} | {} |\n",
                path,
                escape_cell(component),
                if loader { "yes" } else { "" }
            ));
        }
        md.push('\n');
    }

    if !result.api_handlers.is_empty() {
        md.push_str("## API handlers\n\n| Method | Path | Handler | Realtime |\n|---|---|---|---|\n");
        for h in &result.api_handlers {
            md.push_str(&format!(
                "| {} | `{}` | `{}` | {} |\n",
                h.method.map(|m| m.as_str()).unwrap_or("ALL"),
                h.path,
                h.handler_name,
                if h.realtime { "yes" } else { "" }
            ));
        }
        md.push('\n');
    }

    if !result.dependency_changes.is_empty() {
        md.push_str("## Dependencies\n\n");
        for change in &result.dependency_changes {
            md.push_str(&format!("- {}\n", change.describe()));
        }
        md.push('\n');
    }

    let failed: Vec<_> = result
        .files
        .iter()
        .filter(|f| f.status == FileStatus::Failed)
        .collect();
    let modified: Vec<_> = result
        .files
        .iter()
        .filter(|f| f.status == FileStatus::Modified)
        .collect();
    if !modified.is_empty() || !failed.is_empty() {
        md.push_str("## Files\n\n");
        for f in failed {
            md.push_str(&format!("- `{}`: failed, left unchanged\n", f.path));
        }
        for f in modified {
            match f.output_path.as_deref() {
                Some(out) if out != f.path => md.push_str(&format!("- `{}` → `{}`\n", f.path, out)),
                _ => md.push_str(&format!("- `{}`\n", f.path)),
            }
            for t in &f.applied_transformations {
                md.push_str(&format!("  - {}\n", escape_cell(t)));
            }
        }
        md.push('\n');
    }

    if !result.generated_files.is_empty() {
        md.push_str("## Generated files\n\n");
        for g in &result.generated_files {
            md.push_str(&format!("- `{}`: {}\n", g.path, g.description));
        }
        md.push('\n');
    }

    md.push_str("## Diagnostics\n\n");
    if result.diagnostics.is_empty() {
        md.push_str("No diagnostics.\n");
    } else {
        md.push_str(&count_tables(&result.diagnostics));
    }
    for (severity, title) in [
        (Severity::Critical, "Critical"),
        (Severity::Warning, "Warnings"),
        (Severity::Info, "Notes"),
    ] {
        let group: Vec<&Diagnostic> = result.diagnostics_of(severity).collect();
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("### {} ({})\n\n", title, group.len()));
        for d in group {
            md.push_str(&diagnostic_line(d));
        }
        md.push('\n');
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionOptions;
    use crate::orchestrator::{Converter, SourceFile};

    #[tokio::test]
    async fn test_report_lists_routes_handlers_and_diagnostics() {
        let files = vec![
            SourceFile::new("pages/index.tsx", "export default function Home() {\n  return <main />;\n}\n"),
            SourceFile::new("pages/blog/[slug].tsx", "export default function Post() {\n  return null;\n}\n"),
            SourceFile::new(
                "pages/api/users.ts",
                "export default function handler(req, res) {\n  res.status(200).json([]);\n}\n",
            ),
            SourceFile::new("lib/broken.ts", "export function getStaticPaths() {\n  return { paths: [] ;\n"),
        ];
        let result = Converter::new(ConversionOptions::default())
            .convert_sources(files, |_, _| {})
            .await;
        let md = render_markdown(&result);

        assert!(md.starts_with("# nextport conversion report\n"));
        assert!(md.contains("failed (critical diagnostics)"));
        assert!(md.contains("| `/blog/:slug` | pages/blog/[slug].tsx |  |"));
        assert!(md.contains("## API handlers"));
        assert!(md.contains("| ALL | `/api/users` |"));
        assert!(md.contains("- `lib/broken.ts`: failed, left unchanged"));
        assert!(md.contains("### By category"));
        assert!(md.contains("| `lib/broken.ts` | 1 |"));
        assert!(md.contains("### Critical (1)"));
        assert!(md.contains("**RULE_FAILED** `lib/broken.ts`"));
        assert!(md.contains("- `pages/api/users.ts` → `server/routes/users.ts`"));
    }

    #[test]
    fn test_counts_by_category_and_file() {
        use crate::diagnostics::DiagnosticCategory;
        let diagnostics = vec![
            Diagnostic::critical("RULE_FAILED", DiagnosticCategory::Rule, "boom").in_file("lib/a.ts"),
            Diagnostic::warning("RULE_ADVISORY", DiagnosticCategory::Rule, "check").in_file("lib/a.ts"),
            Diagnostic::warning("PARSE_ERROR", DiagnosticCategory::Parse, "token").in_file("pages/b.tsx"),
            Diagnostic::info("API_BACKEND", DiagnosticCategory::Api, "needs a server"),
        ];
        let md = count_tables(&diagnostics);

        assert!(md.contains("| api | 0 | 0 | 1 | 1 |\n| parse | 0 | 1 | 0 | 1 |\n| rule | 1 | 1 | 0 | 2 |\n"));
        assert!(md.contains("| `(project)` | 0 | 0 | 1 |\n| `lib/a.ts` | 1 | 1 | 2 |\n| `pages/b.tsx` | 0 | 1 | 1 |\n"));
    }

    #[test]
    fn test_nested_routes_are_flattened() {
        use crate::routes::{derive_routes, to_target_routes};
        let routes = to_target_routes(
            &derive_routes(&["app/layout.tsx", "app/page.tsx", "app/about/page.tsx"]).routes,
        );
        let mut flat = Vec::new();
        flatten_routes(&routes, "", &mut flat);
        let paths: Vec<&str> = flat.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/", "/about"]);
    }
}

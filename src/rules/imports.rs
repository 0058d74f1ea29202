//! Import bookkeeping shared by the rule table and the AST visitors.

use once_cell::sync::Lazy;
use regex::Regex;

pub const ROUTER_MODULE: &str = "react-router-dom";
pub const HEAD_MODULE: &str = "react-helmet-async";
pub const IMAGE_MODULE: &str = "@unpic/react";

/// react-router names replacing a `next/router` / `next/navigation` import.
pub fn router_import_targets(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "useRouter" => Some(&["useNavigate", "useLocation", "useParams"]),
        "usePathname" => Some(&["useLocation"]),
        "useSearchParams" => Some(&["useSearchParams"]),
        "useParams" => Some(&["useParams"]),
        "redirect" | "permanentRedirect" => Some(&["redirect"]),
        _ => None,
    }
}

/// Maps the specifiers of a router import, dropping the ones without a counterpart.
/// Returns the new names (deduplicated, in order) and the dropped ones.
pub fn map_router_specifiers<'a>(
    specifiers: impl IntoIterator<Item = &'a str>,
) -> (Vec<String>, Vec<String>) {
    let mut mapped: Vec<String> = Vec::new();
    let mut dropped = Vec::new();
    for specifier in specifiers {
        let imported = specifier.trim().trim_start_matches("type ").trim();
        let imported = imported.split(" as ").next().unwrap_or(imported).trim();
        if imported.is_empty() {
            continue;
        }
        match router_import_targets(imported) {
            Some(targets) => {
                for t in targets {
                    if !mapped.iter().any(|m| m == t) {
                        mapped.push(t.to_string());
                    }
                }
            }
            None => dropped.push(imported.to_string()),
        }
    }
    (mapped, dropped)
}

pub fn render_named_import(names: &[String], module: &str, quote: char, semicolon: bool) -> String {
    format!(
        "import {{ {} }} from {q}{}{q}{}",
        names.join(", "),
        module,
        if semicolon { ";" } else { "" },
        q = quote
    )
}

static IMPORT_STATEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^import\b[^;]*?['"][^'"\n]+['"];?[ \t]*\r?\n"#).expect("valid import regex")
});

struct UsageCheck {
    name: &'static str,
    usage: Regex,
}

static ROUTER_USAGES: Lazy<Vec<UsageCheck>> = Lazy::new(|| {
    [
        ("useLoaderData", r"\buseLoaderData\("),
        ("Outlet", r"<Outlet\b"),
        ("redirect", r"\breturn redirect\("),
        ("useNavigate", r"\buseNavigate\("),
        ("useLocation", r"\buseLocation\("),
        ("useParams", r"\buseParams\("),
    ]
    .into_iter()
    .map(|(name, usage)| UsageCheck {
        name,
        usage: Regex::new(usage).expect("valid usage regex"),
    })
    .collect()
});

fn is_bound(text: &str, name: &str) -> bool {
    let escaped = regex::escape(name);
    let patterns = [
        format!(r"import\s*\{{[^}}]*\b{}\b[^}}]*\}}\s*from", escaped),
        format!(r"\b(?:function|const|let|var|class)\s+{}\b", escaped),
    ];
    patterns
        .iter()
        .any(|p| Regex::new(p).map(|re| re.is_match(text)).unwrap_or(false))
}

/// Adds one `react-router-dom` import for router APIs the text uses without
/// importing or declaring them. Returns the text and the names added.
pub fn ensure_router_imports(text: &str) -> (String, Vec<String>) {
    let missing: Vec<String> = ROUTER_USAGES
        .iter()
        .filter(|check| check.usage.is_match(text) && !is_bound(text, check.name))
        .map(|check| check.name.to_string())
        .collect();
    if missing.is_empty() {
        return (text.to_string(), missing);
    }

    let insert_at = IMPORT_STATEMENT_RE
        .find_iter(text)
        .last()
        .map(|m| m.end())
        .unwrap_or(0);
    let line = format!("{}\n", render_named_import(&missing, ROUTER_MODULE, '\'', true));
    let mut out = String::with_capacity(text.len() + line.len());
    out.push_str(&text[..insert_at]);
    out.push_str(&line);
    out.push_str(&text[insert_at..]);
    (out, missing)
}

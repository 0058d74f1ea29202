//! Edge middleware converter
//!
//! Turns `middleware.ts` (`export function middleware(req)` plus an optional
//! `export const config = { matcher }`) into a request middleware for the
//! selected backend framework.

use crate::api::frameworks::replace_all;
use crate::config::{ApiFramework, Syntax};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::scan::{extend_statement_end, matching_close, rewrite_calls};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FUNCTION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^export\s+(?:default\s+)?(?:async\s+)?function(?:\s+\w+)?\s*\(")
        .expect("valid middleware function regex")
});

static ARROW_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^export\s+const\s+middleware\s*=\s*(?:async\s+)?\(")
        .expect("valid middleware arrow regex")
});

static CONFIG_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s+const\s+config\s*(?::\s*\w+\s*)?=\s*\{")
        .expect("valid config regex")
});

static SERVER_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?[^;]*?\s+from\s+['"]next/server['"];?[ \t]*\r?\n?"#)
        .expect("valid next/server import regex")
});

static MATCHER_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"matcher\s*:\s*").expect("valid matcher regex")
});

static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("valid string regex"));

static STATUS_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"status\s*:\s*([^,}\s]+)").expect("valid status regex"));

static IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_$][\w$]*)").expect("valid identifier regex"));

#[derive(Serialize, Debug, Clone)]
pub struct ConvertedMiddleware {
    pub code: String,
    /// Framework mount paths derived from `config.matcher` (`/` when absent).
    pub mount_paths: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn output_path(syntax: Syntax) -> String {
    format!("server/middleware.{}", syntax.module_ext())
}

fn not_found(message: &str) -> Diagnostic {
    Diagnostic::warning("MIDDLEWARE_NOT_FOUND", DiagnosticCategory::Middleware, message)
        .with_suggestion("Port the middleware by hand as a framework middleware")
}

struct LocatedMiddleware {
    start: usize,
    end: usize,
    req: String,
    body: String,
}

fn locate(source: &str) -> Result<LocatedMiddleware, Diagnostic> {
    let head = FUNCTION_HEAD
        .find_iter(source)
        .find(|m| m.as_str().contains("middleware") || m.as_str().contains("default"))
        .or_else(|| ARROW_HEAD.find(source))
        .ok_or_else(|| not_found("No exported middleware function found"))?;

    let open_paren = head.end() - 1;
    let close_paren = matching_close(source, open_paren)
        .ok_or_else(|| not_found("Unbalanced middleware parameter list"))?;
    let req = IDENT
        .captures(&source[open_paren + 1..close_paren])
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "req".to_string());

    let open_brace = source[close_paren..]
        .find('{')
        .map(|i| close_paren + i)
        .ok_or_else(|| not_found("Middleware has no block body"))?;
    let close_brace = matching_close(source, open_brace)
        .ok_or_else(|| not_found("Unbalanced middleware body"))?;

    Ok(LocatedMiddleware {
        start: head.start(),
        end: extend_statement_end(source, close_brace + 1),
        req,
        body: source[open_brace + 1..close_brace].to_string(),
    })
}

/// `/dashboard/:path*` → `/dashboard/*`. Regex matchers are kept with a warning.
fn mount_path(matcher: &str, warnings: &mut Vec<String>) -> String {
    if matcher.contains('(') {
        warnings.push(format!(
            "Matcher '{}' uses a regular expression; mount path needs review",
            matcher
        ));
    }
    let converted: Vec<String> = matcher
        .split('/')
        .map(|seg| {
            if seg.starts_with(':') && (seg.ends_with('*') || seg.ends_with('+')) {
                "*".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect();
    let path = converted.join("/");
    if path.is_empty() { "/".to_string() } else { path }
}

/// Mount paths from `config.matcher`, and the config span to drop.
fn matcher_config(source: &str, warnings: &mut Vec<String>) -> (Vec<String>, Option<(usize, usize)>) {
    let Some(m) = CONFIG_EXPORT.find(source) else {
        return (vec!["/".to_string()], None);
    };
    let open = m.end() - 1;
    let Some(close) = matching_close(source, open) else {
        return (vec!["/".to_string()], None);
    };
    let object = &source[open..=close];
    let mut paths = Vec::new();
    if let Some(mv) = MATCHER_VALUE.find(object) {
        let rest = &object[mv.end()..];
        let value = if rest.starts_with('[') {
            matching_close(rest, 0).map(|c| &rest[..=c]).unwrap_or(rest)
        } else {
            rest.split([',', '}', '\n']).next().unwrap_or("")
        };
        for caps in STRING_LITERAL.captures_iter(value) {
            paths.push(mount_path(&caps[1], warnings));
        }
    }
    if paths.is_empty() {
        paths.push("/".to_string());
    }
    (paths, Some((m.start(), extend_statement_end(source, close + 1))))
}

fn json_call(args: &[&str], emit: impl Fn(&str, Option<&str>) -> String) -> Option<String> {
    let body = args.first().copied().unwrap_or("null");
    let status = args
        .get(1)
        .and_then(|opts| STATUS_OPTION.captures(opts))
        .map(|c| c[1].to_string());
    Some(emit(body, status.as_deref()))
}

/// First argument of `new URL(path, req.url)`, or the expression as written.
fn redirect_target(arg: &str) -> String {
    let arg = arg.trim();
    if let Some(inner) = arg.strip_prefix("new URL(").and_then(|a| a.strip_suffix(')'))
        && let Some(first) = crate::scan::split_top_level(inner).first()
    {
        return first.to_string();
    }
    arg.to_string()
}

struct Vocabulary {
    next: &'static str,
    pathname: String,
    search_param: String,
    cookie: String,
    header: String,
}

fn vocabulary(framework: ApiFramework, req: &str) -> Vocabulary {
    match framework {
        ApiFramework::Express => Vocabulary {
            next: "next()",
            pathname: format!("{}.path", req),
            search_param: format!("{}.query[$1]", req),
            cookie: format!("{}.cookies?.[$1]", req),
            header: format!("{}.get($1)", req),
        },
        ApiFramework::Fastify => Vocabulary {
            next: "undefined",
            pathname: format!("{}.url.split('?')[0]", req),
            search_param: format!("{}.query[$1]", req),
            cookie: format!("{}.cookies?.[$1]", req),
            header: format!("{}.headers[$1]", req),
        },
        ApiFramework::Hono => Vocabulary {
            next: "next()",
            pathname: "c.req.path".to_string(),
            search_param: "c.req.query($1)".to_string(),
            cookie: "getCookie(c, $1)".to_string(),
            header: "c.req.header($1)".to_string(),
        },
    }
}

fn remap_body(body: &str, framework: ApiFramework, req: &str, warnings: &mut Vec<String>) -> (String, Vec<String>) {
    let mut imports = Vec::new();
    let r = regex::escape(req);
    let vocab = vocabulary(framework, req);
    let res = match framework {
        ApiFramework::Express => "res",
        ApiFramework::Fastify => "reply",
        ApiFramework::Hono => "c",
    };

    if Regex::new(r"=\s*NextResponse\.next\(").is_ok_and(|re| re.is_match(body)) {
        warnings.push(format!(
            "Response returned by NextResponse.next() is modified; set headers on '{}' instead",
            res
        ));
    }
    for (pattern, label) in [
        (r"\bNextResponse\.rewrite\(", "NextResponse.rewrite() has no direct counterpart; proxy the request instead"),
        (r"\.geo\b", "Request geo data is not available outside the edge runtime"),
        (r"\.ip\b", "Request ip must come from the framework or a proxy header"),
    ] {
        if Regex::new(pattern).is_ok_and(|re| re.is_match(body)) {
            warnings.push(label.to_string());
        }
    }

    let mut out = rewrite_calls(body, "NextResponse.json", |args| {
        json_call(args, |b, status| match (framework, status) {
            (ApiFramework::Express, Some(s)) => format!("res.status({}).json({})", s, b),
            (ApiFramework::Express, None) => format!("res.json({})", b),
            (ApiFramework::Fastify, Some(s)) => format!("reply.code({}).send({})", s, b),
            (ApiFramework::Fastify, None) => format!("reply.send({})", b),
            (ApiFramework::Hono, Some(s)) => format!("c.json({}, {})", b, s),
            (ApiFramework::Hono, None) => format!("c.json({})", b),
        })
    });
    out = rewrite_calls(&out, "NextResponse.redirect", |args| {
        let target = redirect_target(args.first().copied().unwrap_or("'/'"));
        Some(format!("{}.redirect({})", res, target))
    });
    out = rewrite_calls(&out, "NextResponse.next", |_| Some(vocab.next.to_string()));

    out = replace_all(&out, &format!(r"\b{r}\.nextUrl\.pathname\b"), &vocab.pathname);
    out = replace_all(
        &out,
        &format!(r"\b{r}\.nextUrl\.searchParams\.get\(([^()]*)\)"),
        &vocab.search_param,
    );
    out = replace_all(
        &out,
        &format!(r"\b{r}\.cookies\.get\(([^()]*)\)(?:\?\.value|\.value)?"),
        &vocab.cookie,
    );
    out = replace_all(&out, &format!(r"\b{r}\.headers\.get\(([^()]*)\)"), &vocab.header);

    if framework == ApiFramework::Hono {
        if out.contains("getCookie(c") {
            imports.push("import { getCookie } from 'hono/cookie';".to_string());
        }
        if Regex::new(&format!(r"(^|[^.\w$]){r}\b")).is_ok_and(|re| re.is_match(&out)) {
            warnings.push(format!(
                "Remaining uses of '{}' need a manual rewrite to the Hono context",
                req
            ));
        }
    } else if out.contains(".cookies?.[") {
        warnings.push(match framework {
            ApiFramework::Fastify => "Cookie access requires @fastify/cookie".to_string(),
            _ => "Cookie access requires the cookie-parser middleware".to_string(),
        });
    }
    if out.contains("NextResponse") || out.contains("nextUrl") {
        warnings.push("Some NextResponse or nextUrl usages were left as written".to_string());
    }
    (out, imports)
}

fn signature(framework: ApiFramework, req: &str, typed: bool) -> String {
    match (framework, typed) {
        (ApiFramework::Express, true) => format!(
            "export async function middleware({}: Request, res: Response, next: NextFunction)",
            req
        ),
        (ApiFramework::Express, false) => format!("export async function middleware({}, res, next)", req),
        (ApiFramework::Fastify, true) => format!(
            "export async function middleware({}: FastifyRequest, reply: FastifyReply)",
            req
        ),
        (ApiFramework::Fastify, false) => format!("export async function middleware({}, reply)", req),
        (ApiFramework::Hono, true) => "export async function middleware(c: Context, next: Next)".to_string(),
        (ApiFramework::Hono, false) => "export async function middleware(c, next)".to_string(),
    }
}

fn framework_imports(framework: ApiFramework, typed: bool) -> Vec<String> {
    if !typed {
        return Vec::new();
    }
    vec![match framework {
        ApiFramework::Express => "import type { Express, NextFunction, Request, Response } from 'express';",
        ApiFramework::Fastify => "import type { FastifyInstance, FastifyReply, FastifyRequest } from 'fastify';",
        ApiFramework::Hono => "import type { Context, Hono, Next } from 'hono';",
    }
    .to_string()]
}

fn registration(framework: ApiFramework, mounts: &[String], typed: bool) -> String {
    let quoted = |p: &str| format!("'{}'", p);
    match framework {
        ApiFramework::Express => {
            let lines: String = mounts
                .iter()
                .map(|p| {
                    let prefix = p.trim_end_matches("/*");
                    let prefix = if prefix.is_empty() { "/" } else { prefix };
                    format!("  app.use({}, middleware);\n", quoted(prefix))
                })
                .collect();
            format!(
                "export function register(app{}) {{\n{}}}\n",
                if typed { ": Express" } else { "" },
                lines
            )
        }
        ApiFramework::Fastify => {
            let prefixes: Vec<String> = mounts
                .iter()
                .map(|p| quoted(p.trim_end_matches('*')))
                .collect();
            format!(
                "const MOUNT_PATHS = [{}];\n\nexport function register(app{}) {{\n  app.addHook('onRequest', async (request, reply) => {{\n    if (MOUNT_PATHS.some((p) => request.url.startsWith(p))) {{\n      return middleware(request, reply);\n    }}\n  }});\n}}\n",
                prefixes.join(", "),
                if typed { ": FastifyInstance" } else { "" }
            )
        }
        ApiFramework::Hono => {
            let lines: String = mounts
                .iter()
                .map(|p| format!("  app.use({}, middleware);\n", quoted(if p == "/" { "*" } else { p })))
                .collect();
            format!(
                "export function register(app{}) {{\n{}}}\n",
                if typed { ": Hono" } else { "" },
                lines
            )
        }
    }
}

pub fn convert_middleware(
    source: &str,
    framework: ApiFramework,
    typed: bool,
) -> Result<ConvertedMiddleware, Diagnostic> {
    let located = locate(source)?;
    let mut warnings = Vec::new();
    let (mount_paths, config_span) = matcher_config(source, &mut warnings);

    let mut spans = vec![(located.start, located.end)];
    spans.extend(config_span);
    spans.sort();
    let mut rest = String::new();
    let mut cursor = 0usize;
    for (start, end) in spans {
        if start < cursor {
            continue;
        }
        rest.push_str(&source[cursor..start]);
        cursor = end;
    }
    rest.push_str(&source[cursor..]);
    let rest = SERVER_IMPORT.replace_all(&rest, "").into_owned();

    let (body, extra_imports) = remap_body(&located.body, framework, &located.req, &mut warnings);

    let mut imports = framework_imports(framework, typed);
    imports.extend(extra_imports);

    let mut code = String::new();
    if !imports.is_empty() {
        code.push_str(&imports.join("\n"));
        code.push_str("\n\n");
    }
    let rest = rest.trim();
    if !rest.is_empty() {
        code.push_str(rest);
        code.push_str("\n\n");
    }
    code.push_str(&signature(framework, &located.req, typed));
    code.push_str(" {");
    code.push_str(&body);
    code.push_str("}\n\n");
    code.push_str(&registration(framework, &mount_paths, typed));

    Ok(ConvertedMiddleware {
        code,
        mount_paths,
        warnings,
    })
}

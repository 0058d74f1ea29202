//! Per-framework vocabulary: imports, request/response remapping, registration,
//! realtime scaffold and test stub.

use crate::api::method::HttpMethod;
use crate::config::ApiFramework;
use crate::scan::matching_close;
use regex::{Captures, Regex};

/// What the emitter knows about the handler being re-emitted.
#[derive(Debug, Clone)]
pub struct HandlerParts<'a> {
    pub name: &'a str,
    pub req: &'a str,
    pub res: &'a str,
    pub params: &'a [String],
    pub method: Option<HttpMethod>,
    /// react-router style API path (`/api/users/:id`).
    pub path: &'a str,
    pub is_async: bool,
    pub typed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Remapped {
    pub body: String,
    pub prelude: Vec<String>,
    pub imports: Vec<String>,
    pub warnings: Vec<String>,
}

pub trait FrameworkTarget: Send + Sync {
    fn framework(&self) -> ApiFramework;
    fn imports(&self, typed: bool) -> Vec<String>;
    /// Types replacing `NextApiRequest` / `NextApiResponse` in the rest of the module.
    fn request_type(&self) -> &'static str;
    fn response_type(&self) -> &'static str;
    fn signature(&self, parts: &HandlerParts<'_>) -> String;
    fn remap(&self, body: &str, parts: &HandlerParts<'_>) -> Remapped;
    fn registration(&self, parts: &HandlerParts<'_>) -> String;
    fn realtime_scaffold(&self, parts: &HandlerParts<'_>) -> (Vec<String>, String);
    fn test_stub(&self, module: &str, parts: &HandlerParts<'_>) -> String;
}

pub fn target_for(framework: ApiFramework) -> Box<dyn FrameworkTarget> {
    match framework {
        ApiFramework::Express => Box::new(Express),
        ApiFramework::Fastify => Box::new(Fastify),
        ApiFramework::Hono => Box::new(Hono),
    }
}

pub(crate) fn replace_all(text: &str, pattern: &str, replacement: &str) -> String {
    match Regex::new(pattern) {
        Ok(re) => re.replace_all(text, replacement).into_owned(),
        Err(_) => text.to_string(),
    }
}

pub(crate) fn replace_with(text: &str, pattern: &str, f: impl FnMut(&Captures<'_>) -> String) -> String {
    match Regex::new(pattern) {
        Ok(re) => re.replace_all(text, f).into_owned(),
        Err(_) => text.to_string(),
    }
}

fn params_alternation(params: &[String]) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    Some(
        params
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn destructured_names(pattern: &str) -> Vec<String> {
    pattern
        .split(',')
        .map(|p| {
            p.split([':', '='])
                .next()
                .unwrap_or("")
                .trim()
                .trim_start_matches("...")
                .to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Route params move from `req.query` to `req.params` (Express and Fastify).
fn move_params_to_params(body: &str, req: &str, params: &[String], warnings: &mut Vec<String>) -> String {
    let Some(alt) = params_alternation(params) else {
        return body.to_string();
    };
    let r = regex::escape(req);
    let mut out = replace_all(body, &format!(r"\b{r}\.query\.({alt})\b"), &format!("{req}.params.$1"));
    out = replace_all(
        &out,
        &format!(r#"\b{r}\.query\[['"]({alt})['"]\]"#),
        &format!("{req}.params.$1"),
    );
    out = replace_with(
        &out,
        &format!(r"\b(const|let|var)\s*\{{([^}}]*)\}}\s*=\s*{r}\.query\b"),
        |caps| {
            let names = destructured_names(&caps[2]);
            let routed = names.iter().filter(|n| params.contains(n)).count();
            if routed > 0 && routed == names.len() {
                format!("{} {{{}}} = {}.params", &caps[1], &caps[2], req)
            } else {
                if routed > 0 {
                    warnings.push(format!(
                        "Route parameters and query values are destructured together from {}.query; split them between {}.params and {}.query",
                        req, req, req
                    ));
                }
                caps[0].to_string()
            }
        },
    );
    out
}

fn next_only_response_apis(body: &str, res: &str, warnings: &mut Vec<String>) {
    let r = regex::escape(res);
    for (api, hint) in [
        ("revalidate", "on-demand revalidation has no counterpart"),
        ("setPreviewData", "preview mode has no counterpart"),
        ("clearPreviewData", "preview mode has no counterpart"),
        ("setDraftMode", "draft mode has no counterpart"),
    ] {
        if Regex::new(&format!(r"\b{r}\.{api}\(")).is_ok_and(|re| re.is_match(body)) {
            warnings.push(format!("{}.{}(): {}", res, api, hint));
        }
    }
}

fn sample_url(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.starts_with(':') {
                "1"
            } else if seg == "*" {
                "a/b"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Static prefix of the path, usable as a socket path.
fn realtime_path(path: &str) -> String {
    let prefix: Vec<&str> = path
        .split('/')
        .take_while(|s| !s.starts_with(':') && *s != "*")
        .collect();
    format!("{}/socket", prefix.join("/"))
}

fn test_method(parts: &HandlerParts<'_>) -> HttpMethod {
    parts.method.unwrap_or(HttpMethod::Get)
}

fn socket_io_scaffold(server_expr: &str, param: &str) -> String {
    format!(
        "export function attachRealtime({param}) {{\n  const io = new Server({server_expr}, {{ path: '{{path}}' }});\n  io.on('connection', (socket) => {{\n    socket.on('message', (payload) => io.emit('message', payload));\n  }});\n  return io;\n}}\n",
        param = param,
        server_expr = server_expr
    )
}

pub struct Express;

impl FrameworkTarget for Express {
    fn framework(&self) -> ApiFramework {
        ApiFramework::Express
    }

    fn imports(&self, typed: bool) -> Vec<String> {
        if typed {
            vec!["import type { Express, Request, Response } from 'express';".to_string()]
        } else {
            Vec::new()
        }
    }

    fn request_type(&self) -> &'static str {
        "Request"
    }

    fn response_type(&self) -> &'static str {
        "Response"
    }

    fn signature(&self, parts: &HandlerParts<'_>) -> String {
        let (req, res) = if parts.typed {
            (format!("{}: Request", parts.req), format!("{}: Response", parts.res))
        } else {
            (parts.req.to_string(), parts.res.to_string())
        };
        format!(
            "export {}function {}({}, {})",
            if parts.is_async { "async " } else { "" },
            parts.name,
            req,
            res
        )
    }

    fn remap(&self, body: &str, parts: &HandlerParts<'_>) -> Remapped {
        let mut warnings = Vec::new();
        let out = move_params_to_params(body, parts.req, parts.params, &mut warnings);
        next_only_response_apis(&out, parts.res, &mut warnings);
        Remapped {
            body: out,
            warnings,
            ..Remapped::default()
        }
    }

    fn registration(&self, parts: &HandlerParts<'_>) -> String {
        let verb = parts.method.map(|m| m.lower()).unwrap_or_else(|| "all".to_string());
        format!(
            "export function register(app{}) {{\n  app.{}('{}', {});\n}}\n",
            if parts.typed { ": Express" } else { "" },
            verb,
            parts.path,
            parts.name
        )
    }

    fn realtime_scaffold(&self, parts: &HandlerParts<'_>) -> (Vec<String>, String) {
        let mut imports = vec!["import { Server } from 'socket.io';".to_string()];
        let param = if parts.typed {
            imports.push("import type { Server as HttpServer } from 'node:http';".to_string());
            "server: HttpServer"
        } else {
            "server"
        };
        let code = socket_io_scaffold("server", param).replace("{path}", &realtime_path(parts.path));
        (imports, code)
    }

    fn test_stub(&self, module: &str, parts: &HandlerParts<'_>) -> String {
        let method = test_method(parts);
        format!(
            "import {{ describe, it, expect }} from 'vitest';\nimport express from 'express';\nimport request from 'supertest';\nimport {{ register }} from '{module}';\n\ndescribe('{upper} {path}', () => {{\n  it('responds with 200', async () => {{\n    const app = express();\n    app.use(express.json());\n    register(app);\n    const res = await request(app).{lower}('{url}');\n    expect(res.status).toBe(200);\n  }});\n}});\n",
            module = module,
            upper = method.as_str(),
            lower = method.lower(),
            path = parts.path,
            url = sample_url(parts.path)
        )
    }
}

pub struct Fastify;

impl FrameworkTarget for Fastify {
    fn framework(&self) -> ApiFramework {
        ApiFramework::Fastify
    }

    fn imports(&self, typed: bool) -> Vec<String> {
        if typed {
            vec!["import type { FastifyInstance, FastifyReply, FastifyRequest } from 'fastify';".to_string()]
        } else {
            Vec::new()
        }
    }

    fn request_type(&self) -> &'static str {
        "FastifyRequest"
    }

    fn response_type(&self) -> &'static str {
        "FastifyReply"
    }

    fn signature(&self, parts: &HandlerParts<'_>) -> String {
        let (req, res) = if parts.typed {
            let params = if parts.params.is_empty() {
                "Record<string, string>".to_string()
            } else {
                format!(
                    "{{ {} }}",
                    parts
                        .params
                        .iter()
                        .map(|p| format!("{}: string", p))
                        .collect::<Vec<_>>()
                        .join("; ")
                )
            };
            (
                format!(
                    "{}: FastifyRequest<{{ Params: {}; Querystring: Record<string, string>; Body: any }}>",
                    parts.req, params
                ),
                format!("{}: FastifyReply", parts.res),
            )
        } else {
            (parts.req.to_string(), parts.res.to_string())
        };
        format!("export async function {}({}, {})", parts.name, req, res)
    }

    fn remap(&self, body: &str, parts: &HandlerParts<'_>) -> Remapped {
        let mut warnings = Vec::new();
        let r = regex::escape(parts.res);
        let res = parts.res;
        let mut out = move_params_to_params(body, parts.req, parts.params, &mut warnings);
        next_only_response_apis(&out, res, &mut warnings);
        out = replace_all(&out, &format!(r"\b{r}\.status\("), &format!("{res}.code("));
        out = replace_all(&out, &format!(r"\b{r}\.json\("), &format!("{res}.send("));
        out = replace_all(&out, &format!(r"(\b{r}\.code\([^()]*\))\.json\("), "$1.send(");
        out = replace_all(&out, &format!(r"\b{r}\.setHeader\("), &format!("{res}.header("));
        out = replace_all(&out, &format!(r"(\b{r}(?:\.code\([^()]*\))?)\.end\("), "$1.send(");
        Remapped {
            body: out,
            warnings,
            ..Remapped::default()
        }
    }

    fn registration(&self, parts: &HandlerParts<'_>) -> String {
        let verb = parts.method.map(|m| m.lower()).unwrap_or_else(|| "all".to_string());
        format!(
            "export async function register(app{}) {{\n  app.{}('{}', {});\n}}\n",
            if parts.typed { ": FastifyInstance" } else { "" },
            verb,
            parts.path,
            parts.name
        )
    }

    fn realtime_scaffold(&self, parts: &HandlerParts<'_>) -> (Vec<String>, String) {
        let param = if parts.typed { "app: FastifyInstance" } else { "app" };
        let code = socket_io_scaffold("app.server", param).replace("{path}", &realtime_path(parts.path));
        (vec!["import { Server } from 'socket.io';".to_string()], code)
    }

    fn test_stub(&self, module: &str, parts: &HandlerParts<'_>) -> String {
        let method = test_method(parts);
        format!(
            "import {{ describe, it, expect }} from 'vitest';\nimport Fastify from 'fastify';\nimport {{ register }} from '{module}';\n\ndescribe('{upper} {path}', () => {{\n  it('responds with 200', async () => {{\n    const app = Fastify();\n    await register(app);\n    const res = await app.inject({{ method: '{upper}', url: '{url}' }});\n    expect(res.statusCode).toBe(200);\n  }});\n}});\n",
            module = module,
            upper = method.as_str(),
            path = parts.path,
            url = sample_url(parts.path)
        )
    }
}

pub struct Hono;

/// One `.name(args)` link of a response call chain.
struct ChainCall {
    name: String,
    args: String,
}

/// Parses `res.a(..).b(..)` starting at `start` (the `res` identifier).
fn parse_chain(text: &str, start: usize, res: &str) -> Option<(Vec<ChainCall>, usize)> {
    let bytes = text.as_bytes();
    let mut i = start + res.len();
    let mut calls = Vec::new();
    while bytes.get(i) == Some(&b'.') {
        let name_start = i + 1;
        let mut j = name_start;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
            j += 1;
        }
        if bytes.get(j) != Some(&b'(') {
            break;
        }
        let close = matching_close(text, j)?;
        calls.push(ChainCall {
            name: text[name_start..j].to_string(),
            args: text[j + 1..close].trim().to_string(),
        });
        i = close + 1;
    }
    if calls.is_empty() { None } else { Some((calls, i)) }
}

fn send_body(args: &str) -> (&'static str, String) {
    let arg = args.trim();
    if arg.starts_with(['\'', '"', '`']) {
        ("text", arg.to_string())
    } else {
        ("json", arg.to_string())
    }
}

/// Hono expression for a response chain, and whether it returns.
fn hono_response(calls: &[ChainCall]) -> Option<(String, bool)> {
    let mut status: Option<String> = None;
    let mut headers = Vec::new();
    for call in calls {
        match call.name.as_str() {
            "status" => status = Some(call.args.clone()),
            "setHeader" => headers.push(format!("c.header({})", call.args)),
            "json" | "send" | "end" => {
                let (kind, body) = match call.name.as_str() {
                    "json" => ("json", call.args.clone()),
                    "send" => send_body(&call.args),
                    _ => ("body", "null".to_string()),
                };
                let body = if body.is_empty() { "null".to_string() } else { body };
                let expr = match &status {
                    Some(s) => format!("c.{}({}, {})", kind, body, s),
                    None => format!("c.{}({})", kind, body),
                };
                return Some((expr, true));
            }
            "redirect" => {
                let args = crate::scan::split_top_level(&call.args);
                let expr = match args.as_slice() {
                    [url] => format!("c.redirect({})", url),
                    [code, url] => format!("c.redirect({}, {})", url, code),
                    _ => return None,
                };
                return Some((expr, true));
            }
            _ => return None,
        }
    }
    if let Some(s) = status {
        headers.push(format!("c.status({})", s));
    }
    if headers.is_empty() {
        None
    } else {
        Some((headers.join("; "), false))
    }
}

impl Hono {
    fn remap_responses(&self, body: &str, res: &str, warnings: &mut Vec<String>) -> String {
        let Ok(re) = Regex::new(&format!(r"\b(return\s+)?{}\.", regex::escape(res))) else {
            return body.to_string();
        };
        let mut out = String::with_capacity(body.len());
        let mut cursor = 0usize;
        for m in re.find_iter(body) {
            if m.start() < cursor {
                continue;
            }
            let res_start = m.end() - res.len() - 1;
            let Some((calls, end)) = parse_chain(body, res_start, res) else { continue };
            match hono_response(&calls) {
                Some((expr, returns)) => {
                    out.push_str(&body[cursor..m.start()]);
                    if returns {
                        out.push_str("return ");
                    }
                    out.push_str(&expr);
                    cursor = end;
                }
                None => warnings.push(format!(
                    "Response call {}.{}() needs a manual Hono rewrite",
                    res,
                    calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join("().")
                )),
            }
        }
        out.push_str(&body[cursor..]);
        out
    }
}

impl FrameworkTarget for Hono {
    fn framework(&self) -> ApiFramework {
        ApiFramework::Hono
    }

    fn imports(&self, typed: bool) -> Vec<String> {
        if typed {
            vec!["import type { Context, Hono } from 'hono';".to_string()]
        } else {
            Vec::new()
        }
    }

    fn request_type(&self) -> &'static str {
        "Context"
    }

    fn response_type(&self) -> &'static str {
        "Context"
    }

    fn signature(&self, parts: &HandlerParts<'_>) -> String {
        format!(
            "export async function {}(c{})",
            parts.name,
            if parts.typed { ": Context" } else { "" }
        )
    }

    fn remap(&self, body: &str, parts: &HandlerParts<'_>) -> Remapped {
        let mut remapped = Remapped::default();
        // Guarded receiver: `req` not preceded by `.`, so produced `c.req` is never re-matched.
        let req = format!(r"(^|[^.\w$]){}", regex::escape(parts.req));
        let mut out = body.to_string();

        if let Some(alt) = params_alternation(parts.params) {
            out = replace_all(&out, &format!(r"{req}\.query\.({alt})\b"), "${1}c.req.param('$2')");
            out = replace_all(
                &out,
                &format!(r#"{req}\.query\[['"]({alt})['"]\]"#),
                "${1}c.req.param('$2')",
            );
            out = replace_with(
                &out,
                &format!(r"\b(const|let|var)\s*\{{([^}}]*)\}}\s*=\s*{}\.query\b", regex::escape(parts.req)),
                |caps| {
                    let names = destructured_names(&caps[2]);
                    if !names.is_empty() && names.iter().all(|n| parts.params.contains(n)) {
                        format!("{} {{{}}} = c.req.param()", &caps[1], &caps[2])
                    } else {
                        caps[0].to_string()
                    }
                },
            );
        }
        out = replace_all(&out, &format!(r"{req}\.query\.(\w+)"), "${1}c.req.query('$2')");
        out = replace_all(&out, &format!(r#"{req}\.query\[['"]([^'"]+)['"]\]"#), "${1}c.req.query('$2')");
        out = replace_all(&out, &format!(r"{req}\.query\b"), "${1}c.req.query()");
        out = replace_all(&out, &format!(r#"{req}\.headers\[['"]([^'"]+)['"]\]"#), "${1}c.req.header('$2')");
        out = replace_all(&out, &format!(r"{req}\.headers\.(\w+)"), "${1}c.req.header('$2')");
        out = replace_all(&out, &format!(r"{req}\.headers\b"), "${1}c.req.header()");
        out = replace_all(&out, &format!(r"{req}\.(method|url)\b"), "${1}c.req.$2");

        if Regex::new(&format!(r"{req}\.cookies\b")).is_ok_and(|re| re.is_match(&out)) {
            out = replace_all(&out, &format!(r"{req}\.cookies\.(\w+)"), "${1}getCookie(c, '$2')");
            out = replace_all(&out, &format!(r"{req}\.cookies\b"), "${1}getCookie(c)");
            remapped
                .imports
                .push("import { getCookie } from 'hono/cookie';".to_string());
        }
        if Regex::new(&format!(r"{req}\.body\b")).is_ok_and(|re| re.is_match(&out)) {
            out = replace_all(&out, &format!(r"{req}\.body\b"), "${1}body");
            remapped
                .prelude
                .push("const body = await c.req.json();".to_string());
        }

        next_only_response_apis(&out, parts.res, &mut remapped.warnings);
        out = self.remap_responses(&out, parts.res, &mut remapped.warnings);

        if Regex::new(&format!(r"{req}\b")).is_ok_and(|re| re.is_match(&out)) {
            remapped.warnings.push(format!(
                "Remaining uses of '{}' need a manual rewrite to the Hono context",
                parts.req
            ));
        }
        if !out.contains("return c.") {
            remapped
                .warnings
                .push("Hono handlers must return a Response; no return statement was produced".to_string());
        }
        remapped.body = out;
        remapped
    }

    fn registration(&self, parts: &HandlerParts<'_>) -> String {
        let verb = parts.method.map(|m| m.lower()).unwrap_or_else(|| "all".to_string());
        format!(
            "export function register(app{}) {{\n  app.{}('{}', {});\n}}\n",
            if parts.typed { ": Hono" } else { "" },
            verb,
            parts.path,
            parts.name
        )
    }

    fn realtime_scaffold(&self, parts: &HandlerParts<'_>) -> (Vec<String>, String) {
        let stream_path = format!("{}/stream", parts.path.trim_end_matches('/'));
        let code = format!(
            "export function registerRealtime(app{}) {{\n  app.get('{}', (c) =>\n    streamSSE(c, async (stream) => {{\n      await stream.writeSSE({{ event: 'ready', data: 'connected' }});\n    }}),\n  );\n}}\n",
            if parts.typed { ": Hono" } else { "" },
            stream_path
        );
        (vec!["import { streamSSE } from 'hono/streaming';".to_string()], code)
    }

    fn test_stub(&self, module: &str, parts: &HandlerParts<'_>) -> String {
        let method = test_method(parts);
        format!(
            "import {{ describe, it, expect }} from 'vitest';\nimport {{ Hono }} from 'hono';\nimport {{ register }} from '{module}';\n\ndescribe('{upper} {path}', () => {{\n  it('responds with 200', async () => {{\n    const app = new Hono();\n    register(app);\n    const res = await app.request('{url}', {{ method: '{upper}' }});\n    expect(res.status).toBe(200);\n  }});\n}});\n",
            module = module,
            upper = method.as_str(),
            path = parts.path,
            url = sample_url(parts.path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts<'a>(params: &'a [String]) -> HandlerParts<'a> {
        HandlerParts {
            name: "getUser",
            req: "req",
            res: "res",
            params,
            method: Some(HttpMethod::Get),
            path: "/api/users/:id",
            is_async: true,
            typed: true,
        }
    }

    #[test]
    fn test_express_moves_route_params() {
        let params = vec!["id".to_string()];
        let out = Express.remap(
            "const user = find(req.query.id, req.query.expand);\nconst { id } = req.query;",
            &parts(&params),
        );
        assert_eq!(
            out.body,
            "const user = find(req.params.id, req.query.expand);\nconst { id } = req.params;"
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_express_mixed_destructuring_warns() {
        let params = vec!["id".to_string()];
        let out = Express.remap("const { id, page } = req.query;", &parts(&params));
        assert_eq!(out.body, "const { id, page } = req.query;");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_fastify_reply_vocabulary() {
        let params = vec!["id".to_string()];
        let out = Fastify.remap(
            "res.setHeader('x', '1');\nres.status(404).json({ error: 'nope' });\nres.json(user);\nres.status(204).end();",
            &parts(&params),
        );
        assert_eq!(
            out.body,
            "res.header('x', '1');\nres.code(404).send({ error: 'nope' });\nres.send(user);\nres.code(204).send();"
        );
    }

    #[test]
    fn test_hono_context_vocabulary() {
        let params = vec!["id".to_string()];
        let out = Hono.remap(
            "\n  const user = await db.find(req.query.id, req.query.tab);\n  if (!user) {\n    return res.status(404).json({ error: 'missing' });\n  }\n  await save(req.body);\n  res.status(200).json(user);\n",
            &parts(&params),
        );
        assert!(out.body.contains("db.find(c.req.param('id'), c.req.query('tab'))"));
        assert!(out.body.contains("return c.json({ error: 'missing' }, 404);"));
        assert!(out.body.contains("await save(body);"));
        assert!(out.body.contains("return c.json(user, 200);"));
        assert_eq!(out.prelude, vec!["const body = await c.req.json();"]);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_hono_redirect_and_text() {
        let out = Hono.remap("res.redirect(307, '/login');\nres.send('ok');", &parts(&[]));
        assert_eq!(out.body, "return c.redirect('/login', 307);\nreturn c.text('ok');");
    }

    #[test]
    fn test_registration_and_stubs() {
        let params = vec!["id".to_string()];
        let p = parts(&params);
        assert_eq!(
            Express.registration(&p),
            "export function register(app: Express) {\n  app.get('/api/users/:id', getUser);\n}\n"
        );
        let all = HandlerParts { method: None, ..p.clone() };
        assert!(Hono.registration(&all).contains("app.all('/api/users/:id', getUser);"));
        assert!(Express.test_stub("./[id]", &p).contains("request(app).get('/api/users/1')"));
        assert!(Fastify.test_stub("./[id]", &p).contains("url: '/api/users/1'"));
        let (imports, code) = Express.realtime_scaffold(&p);
        assert_eq!(imports[0], "import { Server } from 'socket.io';");
        assert!(code.contains("path: '/api/users/socket'"));
    }
}

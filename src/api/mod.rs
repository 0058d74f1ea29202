//! API handler emitter
//!
//! Re-emits a pages-style API module (`export default function handler(req, res)`)
//! as a handler for the selected backend framework, with a registration
//! function and optional realtime scaffold and test stub.

pub mod frameworks;
pub mod handler;
pub mod method;

use crate::ast::{Edit, apply_edits};
use crate::config::{ApiFramework, ConversionOptions, Syntax};
use crate::routes::segment::{Segment, parse_segments, pascal_case, target_path};
use crate::rules::engine::RuleRewriter;
use frameworks::{FrameworkTarget, HandlerParts, target_for};
use handler::{HandlerBody, locate_handler};
use method::{HttpMethod, detect_method};
use serde::Serialize;
use std::path::Path;

/// Directory generated handlers are written to.
pub const SERVER_ROUTES_DIR: &str = "server/routes";

const API_ROOTS: [&str; 2] = ["src/pages/api/", "pages/api/"];

const REALTIME_SIGNALS: [&str; 11] = [
    "socket.io",
    "new WebSocket",
    "WebSocketServer",
    "ws://",
    "wss://",
    "on('connection'",
    "on(\"connection\"",
    "text/event-stream",
    "res.socket",
    "EventSource",
    "new Server(",
];

#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    pub framework: ApiFramework,
    pub typed: bool,
    pub realtime: bool,
    pub tests: bool,
}

impl EmitOptions {
    pub fn from_options(options: &ConversionOptions) -> Self {
        Self {
            framework: options.api_framework,
            typed: options.syntax.is_typescript(),
            realtime: options.include_realtime_channel,
            tests: options.generate_api_tests,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct EmittedHandler {
    pub code: String,
    pub imports: Vec<String>,
    pub warnings: Vec<String>,
    pub handler_name: String,
    /// `None` when the handler serves every method.
    pub method: Option<HttpMethod>,
    pub path: String,
    /// Realtime usage was detected in the source.
    pub realtime: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

fn api_segments(file: &str) -> Option<Vec<Segment>> {
    let normalized = file.replace('\\', "/");
    let rest = API_ROOTS
        .iter()
        .find_map(|root| normalized.strip_prefix(root))?;
    let stem = rest.rsplit_once('.').map(|(s, _)| s).unwrap_or(rest);
    let mut parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
    if parts.last() == Some(&"index") {
        parts.pop();
    }
    parse_segments(parts).ok()
}

/// `pages/api/users/[id].ts` → `/api/users/:id`. `None` outside the API root
/// or for malformed segments.
pub fn api_path(file: &str) -> Option<String> {
    let segments = api_segments(file)?;
    let tail = target_path(&segments);
    Some(if tail == "/" {
        "/api".to_string()
    } else {
        format!("/api{}", tail)
    })
}

/// `pages/api/users/[id].ts` → `server/routes/users/[id].ts`.
pub fn output_path(file: &str, syntax: Syntax) -> String {
    let normalized = file.replace('\\', "/");
    let rest = API_ROOTS
        .iter()
        .find_map(|root| normalized.strip_prefix(root))
        .unwrap_or_else(|| {
            Path::new(&normalized)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("handler")
        });
    let stem = rest.rsplit_once('.').map(|(s, _)| s).unwrap_or(rest);
    format!("{}/{}.{}", SERVER_ROUTES_DIR, stem, syntax.module_ext())
}

/// Test stub path next to the generated handler.
pub fn test_output_path(file: &str, syntax: Syntax) -> String {
    let out = output_path(file, syntax);
    let stem = out.rsplit_once('.').map(|(s, _)| s).unwrap_or(&out);
    format!("{}.test.{}", stem, syntax.module_ext())
}

pub fn detect_realtime(source: &str) -> bool {
    REALTIME_SIGNALS.iter().any(|s| source.contains(s))
}

/// `GET /api/users/:id` → `getUsersById`; `/api` with every method → `handleApi`.
pub fn derive_handler_name(method: Option<HttpMethod>, path: &str) -> String {
    let prefix = method.map(|m| m.lower()).unwrap_or_else(|| "handle".to_string());
    let words: Vec<String> = path
        .trim_start_matches("/api")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(param) = s.strip_prefix(':') {
                format!("By{}", pascal_case(&[param]))
            } else if s == "*" {
                "All".to_string()
            } else {
                pascal_case(&[s])
            }
        })
        .collect();
    if words.is_empty() {
        format!("{}Api", prefix)
    } else {
        format!("{}{}", prefix, words.concat())
    }
}

fn handler_name(original: Option<&str>, method: Option<HttpMethod>, path: &str) -> String {
    match original {
        Some(name) if name != "handler" && !name.is_empty() => name.to_string(),
        _ => derive_handler_name(method, path),
    }
}

/// Drops the spans plus the line break that follows each of them.
fn without_spans(source: &str, spans: &[(usize, usize)]) -> String {
    let edits = spans
        .iter()
        .map(|&(start, end)| {
            let rest = &source[end.min(source.len())..];
            let trailing = if rest.starts_with("\r\n") {
                2
            } else if rest.starts_with('\n') {
                1
            } else {
                0
            };
            Edit::remove(start, end + trailing)
        })
        .collect();
    apply_edits(source, edits)
}

fn indent_body(body: &HandlerBody) -> String {
    match body {
        HandlerBody::Block { inner } => inner.clone(),
        HandlerBody::Expression { expr } => format!("\n  {};\n", expr.trim()),
    }
}

pub struct ApiEmitter {
    rewriter: RuleRewriter,
}

impl ApiEmitter {
    pub fn new(options: &ConversionOptions) -> Self {
        Self {
            rewriter: RuleRewriter::for_api(options),
        }
    }

    pub fn emit(&self, source: &str, path: &str, opts: &EmitOptions) -> EmittedHandler {
        let api = api_path(path).unwrap_or_else(|| "/api".to_string());
        let params: Vec<String> = api_segments(path)
            .unwrap_or_default()
            .iter()
            .filter_map(|s| s.param().map(str::to_string))
            .collect();
        let method = detect_method(source);
        let realtime = detect_realtime(source);

        let Some(located) = locate_handler(path, source) else {
            return EmittedHandler {
                code: source.to_string(),
                imports: Vec::new(),
                warnings: vec![format!(
                    "No default-exported handler function found in {}; file copied unchanged",
                    path
                )],
                handler_name: derive_handler_name(method, &api),
                method,
                path: api,
                realtime,
                tests: None,
            };
        };

        let target: Box<dyn FrameworkTarget> = target_for(opts.framework);
        let name = handler_name(located.name.as_deref(), method, &api);
        let req = located.params.first().map(String::as_str).unwrap_or("req");
        let res = located.params.get(1).map(String::as_str).unwrap_or("res");
        let parts = HandlerParts {
            name: &name,
            req,
            res,
            params: &params,
            method,
            path: &api,
            is_async: located.is_async,
            typed: opts.typed,
        };

        let mut warnings = Vec::new();
        for wrapper in &located.wrappers {
            warnings.push(format!(
                "Handler was wrapped by {}(); reapply it as {} middleware",
                wrapper,
                opts.framework.label()
            ));
        }

        let rest = without_spans(source, &located.remove);
        let rest = match self.rewriter.apply(&rest) {
            Ok(out) => {
                warnings.extend(out.applied.iter().filter_map(|a| a.advisory.clone()));
                out.text
            }
            Err(failure) => {
                warnings.push(failure.to_string());
                rest
            }
        };
        let rest = rest
            .replace("NextApiRequest", target.request_type())
            .replace("NextApiResponse", target.response_type());

        let remapped = target.remap(&indent_body(&located.body), &parts);
        warnings.extend(remapped.warnings);

        let mut imports = target.imports(opts.typed);
        imports.extend(remapped.imports);
        let scaffold = if opts.realtime && realtime {
            let (scaffold_imports, code) = target.realtime_scaffold(&parts);
            imports.extend(scaffold_imports);
            Some(code)
        } else {
            None
        };

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
        code.push_str(&target.signature(&parts));
        code.push_str(" {");
        for line in &remapped.prelude {
            code.push_str("\n  ");
            code.push_str(line);
        }
        code.push_str(&remapped.body);
        if !remapped.body.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("}\n\n");
        code.push_str(&target.registration(&parts));
        if let Some(scaffold) = scaffold {
            code.push('\n');
            code.push_str(&scaffold);
        }

        let tests = opts.tests.then(|| {
            let module = output_path(path, Syntax::Javascript);
            let stem = module
                .rsplit('/')
                .next()
                .and_then(|f| f.rsplit_once('.'))
                .map(|(s, _)| s.to_string())
                .unwrap_or_else(|| "handler".to_string());
            target.test_stub(&format!("./{}", stem), &parts)
        });

        EmittedHandler {
            code,
            imports,
            warnings,
            handler_name: name,
            method,
            path: api,
            realtime,
            tests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter() -> ApiEmitter {
        ApiEmitter::new(&ConversionOptions::default())
    }

    fn opts(framework: ApiFramework) -> EmitOptions {
        EmitOptions {
            framework,
            typed: true,
            realtime: true,
            tests: false,
        }
    }

    #[test]
    fn test_api_path_derivation() {
        assert_eq!(api_path("pages/api/users/[id].ts").as_deref(), Some("/api/users/:id"));
        assert_eq!(api_path("src/pages/api/index.js").as_deref(), Some("/api"));
        assert_eq!(api_path("pages/api/files/[...path].ts").as_deref(), Some("/api/files/*"));
        assert_eq!(api_path("pages/about.tsx"), None);
        assert_eq!(output_path("pages/api/users/[id].ts", Syntax::Javascript), "server/routes/users/[id].js");
        assert_eq!(test_output_path("pages/api/ping.ts", Syntax::Typescript), "server/routes/ping.test.ts");
    }

    #[test]
    fn test_handler_names() {
        assert_eq!(derive_handler_name(Some(HttpMethod::Get), "/api/users/:id"), "getUsersById");
        assert_eq!(derive_handler_name(None, "/api"), "handleApi");
        assert_eq!(handler_name(Some("listPosts"), None, "/api/posts"), "listPosts");
        assert_eq!(handler_name(Some("handler"), Some(HttpMethod::Post), "/api/posts"), "postPosts");
    }

    #[test]
    fn test_post_handler_for_express() {
        let src = "import type { NextApiRequest, NextApiResponse } from 'next';\nimport { db } from '../../lib/db';\n\nexport const config = {\n  api: { bodyParser: false },\n};\n\nexport default async function handler(req: NextApiRequest, res: NextApiResponse) {\n  if (req.method !== 'POST') {\n    return res.status(405).end();\n  }\n  const user = await db.create(req.body);\n  res.status(201).json(user);\n}\n";
        let out = emitter().emit(src, "pages/api/users/index.ts", &opts(ApiFramework::Express));

        assert_eq!(out.method, Some(HttpMethod::Post));
        assert_eq!(out.path, "/api/users");
        assert_eq!(out.handler_name, "postUsers");
        assert!(out.code.starts_with("import type { Express, Request, Response } from 'express';\n\nimport { db } from '../../lib/db';"));
        assert!(!out.code.contains("from 'next'"));
        assert!(!out.code.contains("bodyParser"));
        assert!(out.code.contains("export async function postUsers(req: Request, res: Response) {"));
        assert!(out.code.contains("app.post('/api/users', postUsers);"));
        assert!(!out.realtime);
    }

    #[test]
    fn test_all_methods_handler_for_hono() {
        let src = "export default async function handler(req, res) {\n  const user = await find(req.query.id);\n  res.status(200).json(user);\n}\n";
        let out = emitter().emit(
            src,
            "pages/api/users/[id].js",
            &EmitOptions {
                typed: false,
                ..opts(ApiFramework::Hono)
            },
        );
        assert_eq!(out.method, None);
        assert_eq!(out.handler_name, "handleUsersById");
        assert!(out.code.contains("export async function handleUsersById(c) {"));
        assert!(out.code.contains("find(c.req.param('id'))"));
        assert!(out.code.contains("return c.json(user, 200);"));
        assert!(out.code.contains("app.all('/api/users/:id', handleUsersById);"));
    }

    #[test]
    fn test_server_module_keeps_process_env() {
        let src = "const key = process.env.NEXT_PUBLIC_KEY;\n\nexport default function handler(req, res) {\n  res.json({ key, mode: process.env.NODE_ENV });\n}\n";
        let out = emitter().emit(
            src,
            "pages/api/ping.js",
            &EmitOptions {
                typed: false,
                ..opts(ApiFramework::Express)
            },
        );
        assert!(out.code.contains("const key = process.env.NEXT_PUBLIC_KEY;"));
        assert!(out.code.contains("process.env.NODE_ENV"));
        assert!(!out.code.contains("import.meta.env"));
    }

    #[test]
    fn test_realtime_scaffold_and_test_stub() {
        let src = "export default function handler(req, res) {\n  res.setHeader('Content-Type', 'text/event-stream');\n  res.write('data: hi\\n\\n');\n}\n";
        let out = emitter().emit(
            src,
            "pages/api/events.ts",
            &EmitOptions {
                tests: true,
                ..opts(ApiFramework::Fastify)
            },
        );
        assert!(out.realtime);
        assert!(out.code.contains("import { Server } from 'socket.io';"));
        assert!(out.code.contains("export function attachRealtime(app: FastifyInstance)"));
        let stub = out.tests.unwrap();
        assert!(stub.contains("import { register } from './events';"));
        assert!(stub.contains("method: 'GET', url: '/api/events'"));
    }

    #[test]
    fn test_unlocatable_handler_is_copied() {
        let src = "export const GET = () => new Response('ok');\n";
        let out = emitter().emit(src, "pages/api/ping.ts", &opts(ApiFramework::Express));
        assert_eq!(out.code, src);
        assert_eq!(out.warnings.len(), 1);
    }
}
